use async_trait::async_trait;
use uuid::Uuid;

use quire_db::{Collection, Database, StoreError};

use super::maintenance::PruneRule;
use super::models::Book;
use super::query::{BookFilter, BookPage, PageWindow, SortMode};

/// Persistence port for the catalogue.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert(&self, book: Book) -> Result<Book, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Book>, StoreError>;

    /// Versioned write; fails with [`StoreError::VersionConflict`] when the
    /// stored book changed since `book` was read.
    async fn replace(&self, book: Book) -> Result<Book, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<Option<Book>, StoreError>;

    async fn count(&self, filter: &BookFilter) -> Result<usize, StoreError>;

    async fn find(
        &self,
        filter: &BookFilter,
        sort: SortMode,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Book>, StoreError>;

    /// Count the matches and fetch one clamped page from a single consistent
    /// view of the catalogue.
    async fn find_page(
        &self,
        filter: &BookFilter,
        sort: SortMode,
        page: u64,
        limit: u64,
    ) -> Result<BookPage, StoreError>;

    async fn delete_matching(&self, rule: &PruneRule) -> Result<usize, StoreError>;
}

/// [`BookRepository`] backed by a `quire-db` collection.
#[derive(Clone)]
pub struct CollectionBookRepository {
    books: Collection<Book>,
}

impl CollectionBookRepository {
    pub fn new(books: Collection<Book>) -> Self {
        Self { books }
    }

    pub fn in_memory() -> Self {
        Self::new(Collection::in_memory())
    }

    pub async fn open(db: &Database) -> Result<Self, StoreError> {
        Ok(Self::new(db.collection::<Book>().await?))
    }
}

#[async_trait]
impl BookRepository for CollectionBookRepository {
    async fn insert(&self, book: Book) -> Result<Book, StoreError> {
        self.books.insert(book).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Book>, StoreError> {
        Ok(self.books.get(id).await)
    }

    async fn replace(&self, book: Book) -> Result<Book, StoreError> {
        self.books.replace(book).await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Book>, StoreError> {
        self.books.delete(id).await
    }

    async fn count(&self, filter: &BookFilter) -> Result<usize, StoreError> {
        Ok(self.books.count(|book| filter.matches(book)).await)
    }

    async fn find(
        &self,
        filter: &BookFilter,
        sort: SortMode,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Book>, StoreError> {
        Ok(self
            .books
            .find(
                |book| filter.matches(book),
                |a, b| sort.compare(a, b),
                skip,
                limit,
            )
            .await)
    }

    async fn find_page(
        &self,
        filter: &BookFilter,
        sort: SortMode,
        page: u64,
        limit: u64,
    ) -> Result<BookPage, StoreError> {
        let mut resolved = PageWindow::resolve(0, page, limit);
        let (total, books) = self
            .books
            .find_page(
                |book| filter.matches(book),
                |a, b| sort.compare(a, b),
                |total| {
                    resolved = PageWindow::resolve(total as u64, page, limit);
                    (resolved.skip as usize, resolved.limit as usize)
                },
            )
            .await;

        Ok(BookPage {
            books,
            total: total as u64,
            page: resolved.page,
            pages: resolved.pages,
        })
    }

    async fn delete_matching(&self, rule: &PruneRule) -> Result<usize, StoreError> {
        self.books.delete_many(|book| rule.matches(book)).await
    }
}
