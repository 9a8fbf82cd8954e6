use std::{cmp::Ordering, collections::BTreeMap, path::PathBuf, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

/// A record that can live in a [`Collection`].
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name, also the snapshot file stem.
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);

    /// Store-managed write counter.
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);

    /// Value that must be unique across the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// Documents of one type, keyed by their store-assigned id.
pub struct Collection<T> {
    docs: Arc<RwLock<BTreeMap<Uuid, T>>>,
    snapshot: Option<Arc<PathBuf>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            docs: Arc::clone(&self.docs),
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<T: Document> Default for Collection<T> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<T: Document> Collection<T> {
    pub fn in_memory() -> Self {
        Self {
            docs: Arc::new(RwLock::new(BTreeMap::new())),
            snapshot: None,
        }
    }

    /// Open a collection mirrored to `path`, loading it if the file exists.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let mut docs = BTreeMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let stored: Vec<T> = serde_json::from_slice(&bytes)?;
                for doc in stored {
                    docs.insert(doc.id(), doc);
                }
                tracing::info!(
                    target: "quire-db",
                    collection = T::COLLECTION,
                    documents = docs.len(),
                    "loaded snapshot"
                );
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        Ok(Self {
            docs: Arc::new(RwLock::new(docs)),
            snapshot: Some(Arc::new(path)),
        })
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Insert a new document. The store assigns its id and resets its version.
    pub async fn insert(&self, mut doc: T) -> Result<T, StoreError> {
        let mut docs = self.docs.write().await;

        doc.set_id(Uuid::now_v7());
        doc.set_version(0);
        ensure_unique(&*docs, &doc)?;

        let id = doc.id();
        docs.insert(id, doc.clone());
        if let Err(err) = self.flush(&docs).await {
            docs.remove(&id);
            return Err(err);
        }

        Ok(doc)
    }

    pub async fn get(&self, id: Uuid) -> Option<T> {
        self.docs.read().await.get(&id).cloned()
    }

    pub async fn find_one<F>(&self, filter: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.docs.read().await.values().find(|doc| filter(doc)).cloned()
    }

    pub async fn count<F>(&self, filter: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.docs.read().await.values().filter(|doc| filter(doc)).count()
    }

    /// Matching documents ordered by `order`, after skipping `skip`, at most `limit`.
    pub async fn find<F, O>(&self, filter: F, order: O, skip: usize, limit: usize) -> Vec<T>
    where
        F: Fn(&T) -> bool,
        O: Fn(&T, &T) -> Ordering,
    {
        let docs = self.docs.read().await;
        let mut matches: Vec<&T> = docs.values().filter(|doc| filter(doc)).collect();
        matches.sort_by(|a, b| order(a, b));
        matches.into_iter().skip(skip).take(limit).cloned().collect()
    }

    /// Count and page in one read. `window` receives the match count and
    /// returns `(skip, limit)`, so the page and the total always agree.
    pub async fn find_page<F, O, W>(&self, filter: F, order: O, window: W) -> (usize, Vec<T>)
    where
        F: Fn(&T) -> bool,
        O: Fn(&T, &T) -> Ordering,
        W: FnOnce(usize) -> (usize, usize),
    {
        let docs = self.docs.read().await;
        let mut matches: Vec<&T> = docs.values().filter(|doc| filter(doc)).collect();
        let total = matches.len();
        let (skip, limit) = window(total);
        if skip >= total {
            return (total, Vec::new());
        }
        matches.sort_by(|a, b| order(a, b));
        let page = matches.into_iter().skip(skip).take(limit).cloned().collect();
        (total, page)
    }

    /// Compare-and-swap write: succeeds only if the stored version still
    /// equals `doc.version()`. Returns the document with its new version.
    pub async fn replace(&self, mut doc: T) -> Result<T, StoreError> {
        let mut docs = self.docs.write().await;
        let id = doc.id();

        let current = docs.get(&id).ok_or(StoreError::NotFound(id))?;
        if current.version() != doc.version() {
            return Err(StoreError::VersionConflict {
                id,
                expected: doc.version(),
                actual: current.version(),
            });
        }
        ensure_unique(&*docs, &doc)?;

        doc.set_version(doc.version() + 1);
        let previous = docs.insert(id, doc.clone());
        if let Err(err) = self.flush(&docs).await {
            if let Some(previous) = previous {
                docs.insert(id, previous);
            }
            return Err(err);
        }

        Ok(doc)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let mut docs = self.docs.write().await;

        let Some(removed) = docs.remove(&id) else {
            return Ok(None);
        };
        if let Err(err) = self.flush(&docs).await {
            docs.insert(id, removed);
            return Err(err);
        }

        Ok(Some(removed))
    }

    /// Delete every matching document, returning how many were removed.
    pub async fn delete_many<F>(&self, filter: F) -> Result<usize, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        let mut docs = self.docs.write().await;

        let doomed: Vec<Uuid> = docs
            .values()
            .filter(|doc| filter(doc))
            .map(|doc| doc.id())
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let mut removed = Vec::with_capacity(doomed.len());
        for id in &doomed {
            if let Some(doc) = docs.remove(id) {
                removed.push(doc);
            }
        }
        if let Err(err) = self.flush(&docs).await {
            for doc in removed {
                docs.insert(doc.id(), doc);
            }
            return Err(err);
        }

        Ok(doomed.len())
    }

    async fn flush(&self, docs: &BTreeMap<Uuid, T>) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let payload = serde_json::to_vec_pretty(&docs.values().collect::<Vec<_>>())?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, payload).await?;
        tokio::fs::rename(&staging, path.as_path()).await?;

        tracing::debug!(
            target: "quire-db",
            collection = T::COLLECTION,
            documents = docs.len(),
            "snapshot written"
        );
        Ok(())
    }
}

fn ensure_unique<T: Document>(docs: &BTreeMap<Uuid, T>, doc: &T) -> Result<(), StoreError> {
    let Some(key) = doc.unique_key() else {
        return Ok(());
    };

    let taken = docs
        .values()
        .any(|other| other.id() != doc.id() && other.unique_key().as_deref() == Some(key.as_str()));
    if taken {
        return Err(StoreError::DuplicateKey {
            collection: T::COLLECTION,
            key,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: Uuid,
        version: u64,
        slug: String,
        rank: u32,
    }

    impl Note {
        fn new(slug: &str, rank: u32) -> Self {
            Self {
                id: Uuid::nil(),
                version: 7,
                slug: slug.to_string(),
                rank,
            }
        }
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> Uuid {
            self.id
        }

        fn set_id(&mut self, id: Uuid) {
            self.id = id;
        }

        fn version(&self) -> u64 {
            self.version
        }

        fn set_version(&mut self, version: u64) {
            self.version = version;
        }

        fn unique_key(&self) -> Option<String> {
            Some(self.slug.clone())
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("quire-db-test-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn insert_assigns_id_and_resets_version() {
        let notes = Collection::<Note>::in_memory();
        let stored = notes.insert(Note::new("a", 1)).await.unwrap();

        assert_ne!(stored.id, Uuid::nil());
        assert_eq!(stored.version, 0);
        assert_eq!(notes.get(stored.id).await, Some(stored));
    }

    #[tokio::test]
    async fn unique_keys_are_enforced_on_insert_and_replace() {
        let notes = Collection::<Note>::in_memory();
        notes.insert(Note::new("a", 1)).await.unwrap();
        let b = notes.insert(Note::new("b", 2)).await.unwrap();

        let dup = notes.insert(Note::new("a", 3)).await;
        assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));

        let mut renamed = b.clone();
        renamed.slug = "a".to_string();
        assert!(matches!(
            notes.replace(renamed).await,
            Err(StoreError::DuplicateKey { .. })
        ));

        // Rewriting a document with its own key is fine.
        assert!(notes.replace(b).await.is_ok());
    }

    #[tokio::test]
    async fn replace_rejects_stale_versions() {
        let notes = Collection::<Note>::in_memory();
        let original = notes.insert(Note::new("a", 1)).await.unwrap();

        let mut first = original.clone();
        first.rank = 10;
        let first = notes.replace(first).await.unwrap();
        assert_eq!(first.version, 1);

        let mut stale = original;
        stale.rank = 20;
        match notes.replace(stale).await {
            Err(StoreError::VersionConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected version conflict, got {other:?}"),
        }
        assert_eq!(notes.get(first.id).await.unwrap().rank, 10);
    }

    #[tokio::test]
    async fn replace_missing_document_is_not_found() {
        let notes = Collection::<Note>::in_memory();
        let mut ghost = Note::new("ghost", 1);
        ghost.id = Uuid::now_v7();
        assert!(matches!(
            notes.replace(ghost).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn find_filters_sorts_and_pages() {
        let notes = Collection::<Note>::in_memory();
        for (slug, rank) in [("a", 5), ("b", 1), ("c", 4), ("d", 2), ("e", 3)] {
            notes.insert(Note::new(slug, rank)).await.unwrap();
        }

        let odd = |n: &Note| n.rank % 2 == 1;
        assert_eq!(notes.count(odd).await, 3);

        let page = notes
            .find(|_| true, |a, b| a.rank.cmp(&b.rank), 1, 2)
            .await;
        let ranks: Vec<u32> = page.iter().map(|n| n.rank).collect();
        assert_eq!(ranks, vec![2, 3]);
    }

    #[tokio::test]
    async fn find_page_sizes_the_window_from_the_same_read() {
        let notes = Collection::<Note>::in_memory();
        for (slug, rank) in [("a", 5), ("b", 1), ("c", 4), ("d", 2), ("e", 3)] {
            notes.insert(Note::new(slug, rank)).await.unwrap();
        }

        let mut seen_total = None;
        let (total, page) = notes
            .find_page(
                |n| n.rank > 1,
                |a, b| a.rank.cmp(&b.rank),
                |total| {
                    seen_total = Some(total);
                    (total - 1, 10)
                },
            )
            .await;
        assert_eq!(total, 4);
        assert_eq!(seen_total, Some(4));
        let ranks: Vec<u32> = page.iter().map(|n| n.rank).collect();
        assert_eq!(ranks, vec![5]);

        let (total, page) = notes
            .find_page(|n| n.rank > 9, |a, b| a.rank.cmp(&b.rank), |_| (0, 10))
            .await;
        assert_eq!(total, 0);
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn delete_and_delete_many() {
        let notes = Collection::<Note>::in_memory();
        let a = notes.insert(Note::new("a", 1)).await.unwrap();
        notes.insert(Note::new("b", 2)).await.unwrap();
        notes.insert(Note::new("c", 3)).await.unwrap();

        assert!(notes.delete(a.id).await.unwrap().is_some());
        assert!(notes.delete(a.id).await.unwrap().is_none());
        assert_eq!(notes.delete_many(|n| n.rank >= 2).await.unwrap(), 2);
        assert!(notes.is_empty().await);
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = scratch_dir();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("notes.json");

        let notes = Collection::<Note>::open(path.clone()).await.unwrap();
        let stored = notes.insert(Note::new("kept", 9)).await.unwrap();
        notes.insert(Note::new("dropped", 1)).await.unwrap();
        notes.delete_many(|n| n.slug == "dropped").await.unwrap();

        let reopened = Collection::<Note>::open(path).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert_eq!(reopened.get(stored.id).await, Some(stored));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
