use std::sync::Arc;

use axum::extract::FromRef;

use quire_authz::TokenKeys;
use quire_db::{Collection, Database, StoreError};
use quire_kernel::settings::AuthSettings;

use crate::modules::books::repository::{BookRepository, CollectionBookRepository};
use crate::modules::users::models::User;

/// Shared handles every module's handlers are built from.
#[derive(Clone)]
pub struct AppState {
    pub books: Arc<dyn BookRepository>,
    pub users: Collection<User>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(books: Arc<dyn BookRepository>, users: Collection<User>, tokens: Arc<TokenKeys>) -> Self {
        Self {
            books,
            users,
            tokens,
        }
    }

    /// Open both collections from the configured database.
    pub async fn open(db: &Database, auth: &AuthSettings) -> Result<Self, StoreError> {
        let books = CollectionBookRepository::open(db).await?;
        let users = db.collection::<User>().await?;
        Ok(Self::new(
            Arc::new(books),
            users,
            Arc::new(TokenKeys::from_settings(auth)),
        ))
    }

    /// Fresh state with nothing persisted.
    pub fn in_memory(auth: &AuthSettings) -> Self {
        Self::new(
            Arc::new(CollectionBookRepository::in_memory()),
            Collection::in_memory(),
            Arc::new(TokenKeys::from_settings(auth)),
        )
    }
}

impl FromRef<AppState> for Arc<TokenKeys> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.tokens)
    }
}
