//! Embedded document store used by quire.
//!
//! Each [`Collection`] holds one kind of [`Document`] behind an async
//! read/write lock. Documents get their id from the store, carry a version
//! number that every write bumps, and may declare a unique key. When a data
//! directory is configured, each collection is mirrored to
//! `<data_dir>/<collection>.json` after every write.

mod collection;
mod error;

use std::path::PathBuf;

use quire_kernel::settings::DatabaseSettings;

pub use collection::{Collection, Document};
pub use error::StoreError;

/// Factory for collections sharing one storage location.
#[derive(Debug, Clone, Default)]
pub struct Database {
    data_dir: Option<PathBuf>,
}

impl Database {
    /// A database whose collections never touch the filesystem.
    pub fn in_memory() -> Self {
        Self { data_dir: None }
    }

    pub fn connect(settings: &DatabaseSettings) -> Self {
        match &settings.data_dir {
            Some(dir) => {
                tracing::info!(target: "quire-db", data_dir = %dir.display(), "using snapshot storage");
            }
            None => {
                tracing::info!(target: "quire-db", "using in-memory storage");
            }
        }
        Self {
            data_dir: settings.data_dir.clone(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.data_dir.is_some()
    }

    /// Open (and load, when persistent) the collection for `T`.
    pub async fn collection<T: Document>(&self) -> Result<Collection<T>, StoreError> {
        match &self.data_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                Collection::open(dir.join(format!("{}.json", T::COLLECTION))).await
            }
            None => Ok(Collection::in_memory()),
        }
    }
}
