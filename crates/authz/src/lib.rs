//! Authentication and authorization for quire.
//!
//! Bearer tokens are HS256 JWTs issued by [`TokenKeys`]; handlers opt into
//! authentication by taking an [`AuthUser`] or [`AdminUser`] argument.

mod guard;
mod password;
mod token;

use thiserror::Error;

pub use guard::{AdminUser, AuthUser};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}
