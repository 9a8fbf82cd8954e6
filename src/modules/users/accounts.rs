//! Account creation, credential checks and admin promotion.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use quire_authz::{hash_password, verify_password, AuthError};
use quire_db::{Collection, StoreError};
use quire_http::AppError;

use super::models::User;
use crate::utils::normalize_email;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Email is already registered.")]
    EmailTaken,

    #[error("No account found with this email.")]
    UnknownEmail,

    #[error("Incorrect password. Please try again.")]
    WrongPassword,

    #[error("Password must be at least 6 characters.")]
    WeakPassword,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken
            | AccountError::UnknownEmail
            | AccountError::WrongPassword
            | AccountError::WeakPassword => AppError::bad_request(err.to_string()),
            AccountError::UserNotFound => AppError::not_found(err.to_string()),
            AccountError::Auth(_) | AccountError::Store(_) | AccountError::Task(_) => {
                AppError::Internal(anyhow::Error::new(err).context("Account operation failed"))
            }
        }
    }
}

pub async fn find_by_email(users: &Collection<User>, email: &str) -> Option<User> {
    let email = normalize_email(email);
    users.find_one(|user| user.email == email).await
}

pub async fn find_by_id(users: &Collection<User>, id: Uuid) -> Result<User, AccountError> {
    users.get(id).await.ok_or(AccountError::UserNotFound)
}

/// Register a new account. The email must not be taken.
pub async fn create_account(
    users: &Collection<User>,
    email: &str,
    password: &str,
    is_admin: bool,
) -> Result<User, AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::WeakPassword);
    }
    if find_by_email(users, email).await.is_some() {
        return Err(AccountError::EmailTaken);
    }

    let password_hash = hash_blocking(password.to_string()).await?;
    let user = match users.insert(User::new(email, password_hash, is_admin)).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration of the same address.
        Err(StoreError::DuplicateKey { .. }) => return Err(AccountError::EmailTaken),
        Err(err) => return Err(err.into()),
    };

    tracing::info!(user_id = %user.id, is_admin, "account created");
    Ok(user)
}

/// Check an email and password pair.
pub async fn authenticate(
    users: &Collection<User>,
    email: &str,
    password: &str,
) -> Result<User, AccountError> {
    let user = find_by_email(users, email)
        .await
        .ok_or(AccountError::UnknownEmail)?;

    let candidate = password.to_string();
    let stored = user.password_hash.clone();
    let matches =
        tokio::task::spawn_blocking(move || verify_password(&candidate, &stored)).await??;
    if !matches {
        tracing::debug!(user_id = %user.id, "login rejected: wrong password");
        return Err(AccountError::WrongPassword);
    }
    Ok(user)
}

/// Create an admin account, or grant admin rights to an existing one.
/// Returns the user and whether it was newly created.
pub async fn ensure_admin(
    users: &Collection<User>,
    email: &str,
    password: &str,
) -> Result<(User, bool), AccountError> {
    let Some(mut user) = find_by_email(users, email).await else {
        let user = create_account(users, email, password, true).await?;
        return Ok((user, true));
    };

    if !user.is_admin {
        user.is_admin = true;
        user.updated_at = Utc::now();
        user = users.replace(user).await?;
        tracing::info!(user_id = %user.id, "account promoted to admin");
    }
    Ok((user, false))
}

async fn hash_blocking(password: String) -> Result<String, AccountError> {
    Ok(tokio::task::spawn_blocking(move || hash_password(&password)).await??)
}
