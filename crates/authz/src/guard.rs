use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use quire_http::AppError;

use crate::token::TokenKeys;

/// Caller identity taken from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Not authorized. Missing token."))?;

        let keys = Arc::<TokenKeys>::from_ref(state);
        let claims = keys.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "token verification failed");
            AppError::unauthorized("Token is invalid or expired.")
        })?;

        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            is_admin: claims.is_admin,
        })
    }
}

/// An [`AuthUser`] whose token carries the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::forbidden("Admin access required."));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;

    fn keys() -> Arc<TokenKeys> {
        Arc::new(TokenKeys::new(b"guard-secret", Duration::hours(1)))
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let err = AuthUser::from_request_parts(&mut parts(None), &keys())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let err = AuthUser::from_request_parts(&mut parts(Some("Basic abc")), &keys())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let keys = keys();
        let user_id = Uuid::now_v7();
        let token = keys.issue(user_id, "reader@example.com", false).unwrap();

        let user = AuthUser::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &keys)
            .await
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, "reader@example.com");
    }

    #[tokio::test]
    async fn admin_guard_forbids_regular_users() {
        let keys = keys();
        let token = keys.issue(Uuid::now_v7(), "reader@example.com", false).unwrap();
        let err = AdminUser::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &keys)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let token = keys.issue(Uuid::now_v7(), "owner@example.com", true).unwrap();
        let admin = AdminUser::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &keys)
            .await
            .unwrap();
        assert!(admin.0.is_admin);
    }
}
