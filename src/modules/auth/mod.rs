//! Registration, login and token introspection.

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::{get, post}, Router};
use quire_authz::AuthUser;
use quire_http::{ApiJson, AppError};
use quire_kernel::{InitCtx, Module};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::modules::users::accounts::{authenticate, create_account, AccountError, MIN_PASSWORD_LEN};
use crate::modules::users::models::User;
use crate::state::AppState;

pub struct AuthModule {
    state: AppState,
}

impl AuthModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            token_ttl_hours = ctx.settings.auth.token_ttl_hours,
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/verify-token", get(verify_token))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "description": "Error",
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } }
            }
        });
        let session = json!({
            "description": "Signed-in session",
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/Session" } }
            }
        });

        Some(json!({
            "paths": {
                "/register": {
                    "post": {
                        "summary": "Create an account",
                        "tags": ["Auth"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": { "schema": { "$ref": "#/components/schemas/RegisterRequest" } }
                            }
                        },
                        "responses": { "201": session, "400": error }
                    }
                },
                "/login": {
                    "post": {
                        "summary": "Sign in",
                        "tags": ["Auth"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": { "schema": { "$ref": "#/components/schemas/LoginRequest" } }
                            }
                        },
                        "responses": { "200": session, "400": error }
                    }
                },
                "/verify-token": {
                    "get": {
                        "summary": "Decode the caller's token",
                        "tags": ["Auth"],
                        "security": [{ "bearerAuth": [] }],
                        "responses": {
                            "200": {
                                "description": "Token is valid",
                                "content": {
                                    "application/json": { "schema": { "$ref": "#/components/schemas/TokenInfo" } }
                                }
                            },
                            "401": error
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "RegisterRequest": {
                        "type": "object",
                        "properties": {
                            "email": { "type": "string" },
                            "password": { "type": "string", "minLength": 6 },
                            "confirmPassword": { "type": "string" }
                        },
                        "required": ["email", "password", "confirmPassword"]
                    },
                    "LoginRequest": {
                        "type": "object",
                        "properties": {
                            "email": { "type": "string" },
                            "password": { "type": "string" }
                        },
                        "required": ["email", "password"]
                    },
                    "Session": {
                        "type": "object",
                        "properties": {
                            "token": { "type": "string" },
                            "userId": { "type": "string", "format": "uuid" },
                            "isAdmin": { "type": "boolean" }
                        },
                        "required": ["token", "userId", "isAdmin"]
                    },
                    "TokenInfo": {
                        "type": "object",
                        "properties": {
                            "userId": { "type": "string", "format": "uuid" },
                            "isAdmin": { "type": "boolean" },
                            "email": { "type": "string" }
                        },
                        "required": ["userId", "isAdmin", "email"]
                    }
                }
            }
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub user_id: Uuid,
    pub is_admin: bool,
    pub email: String,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ApiJson<Session>), AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() || body.confirm_password.is_empty() {
        return Err(AppError::bad_request("All fields are required."));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::WeakPassword.into());
    }
    if body.password != body.confirm_password {
        return Err(AppError::bad_request("Passwords do not match."));
    }

    let user = create_account(&state.users, &body.email, &body.password, false).await?;
    Ok((StatusCode::CREATED, ApiJson(session_for(&state, &user)?)))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<ApiJson<Session>, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required."));
    }

    let user = authenticate(&state.users, &body.email, &body.password).await?;
    tracing::info!(user_id = %user.id, "user signed in");
    Ok(ApiJson(session_for(&state, &user)?))
}

async fn verify_token(caller: AuthUser) -> ApiJson<TokenInfo> {
    ApiJson(TokenInfo {
        user_id: caller.user_id,
        is_admin: caller.is_admin,
        email: caller.email,
    })
}

async fn health_check() -> &'static str {
    "auth module is healthy"
}

fn session_for(state: &AppState, user: &User) -> Result<Session, AppError> {
    let token = state
        .tokens
        .issue(user.id, &user.email, user.is_admin)
        .map_err(|err| AppError::Internal(anyhow::Error::new(err).context("Failed to issue token")))?;
    Ok(Session {
        token,
        user_id: user.id,
        is_admin: user.is_admin,
    })
}
