pub mod accounts;
pub mod models;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Router};
use quire_authz::AuthUser;
use quire_http::{ApiJson, AppError};
use quire_kernel::{InitCtx, Module};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::state::AppState;

/// Account profile endpoints.
pub struct UsersModule {
    state: AppState,
}

impl UsersModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let accounts = self.state.users.len().await;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            accounts,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/profile", get(profile))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/profile": {
                    "get": {
                        "summary": "Profile of the calling user",
                        "tags": ["Users"],
                        "security": [{ "bearerAuth": [] }],
                        "responses": {
                            "200": {
                                "description": "Profile",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Profile" }
                                    }
                                }
                            },
                            "401": {
                                "description": "Missing or invalid token",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "404": {
                                "description": "User not found",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Users health check",
                        "tags": ["Users"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Profile": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "userId": { "type": "string", "format": "uuid" },
                            "email": { "type": "string" },
                            "isAdmin": { "type": "boolean" }
                        },
                        "required": ["message", "userId", "email", "isAdmin"]
                    }
                }
            }
        }))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub message: &'static str,
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

async fn profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<ApiJson<Profile>, AppError> {
    let user = accounts::find_by_id(&state.users, caller.user_id).await?;
    Ok(ApiJson(Profile {
        message: "Welcome to your profile!",
        user_id: user.id,
        email: user.email,
        is_admin: user.is_admin,
    }))
}

async fn health_check() -> &'static str {
    "users module is healthy"
}
