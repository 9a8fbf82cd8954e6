//! Catalogue listing: search, filters, sort order and page arithmetic.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use quire_db::StoreError;

use super::models::{Book, Category, Tag};
use super::repository::BookRepository;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 16;
pub const MAX_LIMIT: u64 = 100;

/// Raw query string of `GET /api/books`. Every field is taken as text so
/// that malformed numbers fall back to defaults instead of rejecting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Restriction on one enumerated attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
    /// A value naming no variant; matches nothing.
    Unmatched,
}

impl<T: std::str::FromStr> Selection<T> {
    fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            None | Some("") | Some("All") => Selection::All,
            Some(value) => value.parse().map(Selection::Only).unwrap_or(Selection::Unmatched),
        }
    }
}

impl<T: PartialEq> Selection<T> {
    fn admits(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
            Selection::Unmatched => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    PriceLowHigh,
    PriceHighLow,
    Newest,
    Rating,
    /// Most recently added first; also used for unknown values
    #[default]
    Popularity,
}

impl SortMode {
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some("price-low-high") => SortMode::PriceLowHigh,
            Some("price-high-low") => SortMode::PriceHighLow,
            Some("newest") => SortMode::Newest,
            Some("rating") => SortMode::Rating,
            _ => SortMode::Popularity,
        }
    }

    /// Total order used for listing. Ties fall back to creation time and id
    /// so that consecutive pages never overlap.
    pub fn compare(self, a: &Book, b: &Book) -> Ordering {
        let primary = match self {
            SortMode::PriceLowHigh => a.price.total_cmp(&b.price),
            SortMode::PriceHighLow => b.price.total_cmp(&a.price),
            SortMode::Newest => b.publication_date.cmp(&a.publication_date),
            SortMode::Rating => b.average_rating.total_cmp(&a.average_rating),
            SortMode::Popularity => Ordering::Equal,
        };
        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// Which books a listing request matches.
#[derive(Debug, Clone, PartialEq)]
pub struct BookFilter {
    /// Lower-cased search text
    pub search: Option<String>,
    pub category: Selection<Category>,
    pub tag: Selection<Tag>,
}

impl Default for BookFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: Selection::All,
            tag: Selection::All,
        }
    }
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        let found = match &self.search {
            Some(needle) => {
                book.title.to_lowercase().contains(needle)
                    || book.author.to_lowercase().contains(needle)
            }
            None => true,
        };
        found && self.category.admits(&book.category) && self.tag.admits(&book.tag)
    }
}

/// A fully parsed, immutable listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filter: BookFilter,
    pub sort: SortMode,
    pub page: u64,
    pub limit: u64,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            filter: BookFilter::default(),
            sort: SortMode::default(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListingQuery {
    pub fn from_params(params: &ListingParams) -> Self {
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        Self {
            filter: BookFilter {
                search,
                category: Selection::from_param(params.category.as_deref()),
                tag: Selection::from_param(params.tag.as_deref()),
            },
            sort: SortMode::from_param(params.sort.as_deref()),
            page: parse_page(params.page.as_deref()),
            limit: parse_limit(params.limit.as_deref()),
        }
    }
}

fn parse_page(raw: Option<&str>) -> u64 {
    match raw.map(|v| v.trim().parse::<i64>()) {
        Some(Ok(page)) if page >= 1 => page as u64,
        Some(Ok(_)) => 1,
        _ => DEFAULT_PAGE,
    }
}

fn parse_limit(raw: Option<&str>) -> u64 {
    match raw.map(|v| v.trim().parse::<i64>()) {
        Some(Ok(limit)) => limit.clamp(1, MAX_LIMIT as i64) as u64,
        _ => DEFAULT_LIMIT,
    }
}

/// Resolved position of a page within a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub pages: u64,
    pub skip: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Requests past the last page land on the last page; an empty result
    /// set reports page 1 of 0.
    pub fn resolve(total: u64, requested_page: u64, limit: u64) -> Self {
        let limit = limit.clamp(1, MAX_LIMIT);
        let pages = total.div_ceil(limit);
        let page = requested_page.min(pages).max(1);
        Self {
            page,
            pages,
            skip: (page - 1) * limit,
            limit,
        }
    }
}

/// Response body of `GET /api/books`.
#[derive(Debug, Clone, Serialize)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

/// Run a listing query: count the matches, clamp the page, fetch the window.
pub async fn list_books(
    repo: &dyn BookRepository,
    query: &ListingQuery,
) -> Result<BookPage, StoreError> {
    let page = repo
        .find_page(&query.filter, query.sort, query.page, query.limit)
        .await?;

    tracing::debug!(
        total = page.total,
        page = page.page,
        pages = page.pages,
        returned = page.books.len(),
        sort = ?query.sort,
        "book listing resolved"
    );

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::fixtures;
    use crate::modules::books::repository::CollectionBookRepository;
    use chrono::{Duration, NaiveDate};

    fn params(pairs: &[(&str, &str)]) -> ListingParams {
        let mut p = ListingParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "search" => p.search = value,
                "category" => p.category = value,
                "tag" => p.tag = value,
                "sort" => p.sort = value,
                "page" => p.page = value,
                "limit" => p.limit = value,
                other => panic!("unknown param {other}"),
            }
        }
        p
    }

    async fn seeded(count: usize) -> CollectionBookRepository {
        let repo = CollectionBookRepository::in_memory();
        for i in 0..count {
            let mut book = fixtures::book(&format!("Book {i}"), &format!("isbn-{i}"));
            book.price = ((i * 7) % 10) as f64 + 0.5;
            book.publication_date = NaiveDate::from_ymd_opt(2000 + i as i32, 1, 1).unwrap();
            book.average_rating = (i % 6) as f64 * 0.8;
            book.created_at += Duration::seconds(i as i64);
            repo.insert(book).await.unwrap();
        }
        repo
    }

    #[test]
    fn limit_is_clamped_to_bounds() {
        assert_eq!(ListingQuery::from_params(&params(&[("limit", "0")])).limit, 1);
        assert_eq!(ListingQuery::from_params(&params(&[("limit", "-20")])).limit, 1);
        assert_eq!(ListingQuery::from_params(&params(&[("limit", "500")])).limit, 100);
        assert_eq!(ListingQuery::from_params(&params(&[("limit", "42")])).limit, 42);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let query = ListingQuery::from_params(&params(&[("page", "two"), ("limit", "1.5")]));
        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.limit, DEFAULT_LIMIT);

        let query = ListingQuery::from_params(&params(&[("page", "-3")]));
        assert_eq!(query.page, 1);
    }

    #[test]
    fn all_and_blank_mean_no_restriction() {
        let query = ListingQuery::from_params(&params(&[
            ("category", "All"),
            ("tag", ""),
            ("search", "   "),
        ]));
        assert_eq!(query.filter, BookFilter::default());
    }

    #[test]
    fn enum_filters_parse_labels() {
        let query = ListingQuery::from_params(&params(&[
            ("category", "Science, Technology & Nature"),
            ("tag", "New Release"),
        ]));
        assert_eq!(
            query.filter.category,
            Selection::Only(Category::ScienceTechnologyNature)
        );
        assert_eq!(query.filter.tag, Selection::Only(Tag::NewRelease));

        let query = ListingQuery::from_params(&params(&[("category", "Cookbooks")]));
        assert_eq!(query.filter.category, Selection::Unmatched);
    }

    #[test]
    fn unknown_sort_values_use_default_order() {
        assert_eq!(SortMode::from_param(Some("popularity")), SortMode::Popularity);
        assert_eq!(SortMode::from_param(Some("alphabetical")), SortMode::Popularity);
        assert_eq!(SortMode::from_param(None), SortMode::Popularity);
        assert_eq!(SortMode::from_param(Some("rating")), SortMode::Rating);
    }

    #[test]
    fn search_is_case_insensitive_substring_on_title_or_author() {
        let mut book = fixtures::book("The Dispossessed", "1");
        book.author = "Ursula K. Le Guin".to_string();

        let by_title = ListingQuery::from_params(&params(&[("search", "POSSESS")]));
        let by_author = ListingQuery::from_params(&params(&[("search", "le gu")]));
        let miss = ListingQuery::from_params(&params(&[("search", "Dune")]));

        assert!(by_title.filter.matches(&book));
        assert!(by_author.filter.matches(&book));
        assert!(!miss.filter.matches(&book));
    }

    #[test]
    fn filters_combine_with_and() {
        let mut book = fixtures::book("Moby Dick", "1");
        book.tag = Tag::Bestseller;

        let both = ListingQuery::from_params(&params(&[
            ("category", "Fiction"),
            ("tag", "Bestseller"),
        ]));
        let wrong_tag = ListingQuery::from_params(&params(&[
            ("category", "Fiction"),
            ("tag", "Trending"),
        ]));
        assert!(both.filter.matches(&book));
        assert!(!wrong_tag.filter.matches(&book));
    }

    #[test]
    fn page_window_clamps_to_last_page() {
        assert_eq!(
            PageWindow::resolve(10, 999, 16),
            PageWindow { page: 1, pages: 1, skip: 0, limit: 16 }
        );
        assert_eq!(
            PageWindow::resolve(45, 9, 10),
            PageWindow { page: 5, pages: 5, skip: 40, limit: 10 }
        );
        assert_eq!(
            PageWindow::resolve(0, 3, 16),
            PageWindow { page: 1, pages: 0, skip: 0, limit: 16 }
        );
    }

    #[tokio::test]
    async fn listing_reports_total_before_pagination() {
        let repo = seeded(25).await;
        let query = ListingQuery::from_params(&params(&[("limit", "10"), ("page", "3")]));

        let page = list_books(&repo, &query).await.unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(page.books.len(), 5);
    }

    #[tokio::test]
    async fn out_of_range_page_returns_the_last_page() {
        let repo = seeded(10).await;
        let query = ListingQuery::from_params(&params(&[("page", "999"), ("limit", "16")]));

        let page = list_books(&repo, &query).await.unwrap();
        assert_eq!((page.page, page.pages, page.total), (1, 1, 10));
        assert_eq!(page.books.len(), 10);
    }

    #[tokio::test]
    async fn empty_results_report_zero_pages() {
        let repo = seeded(3).await;
        let query = ListingQuery::from_params(&params(&[("search", "no such book")]));

        let page = list_books(&repo, &query).await.unwrap();
        assert_eq!((page.page, page.pages, page.total), (1, 0, 0));
        assert!(page.books.is_empty());
    }

    #[tokio::test]
    async fn every_sort_mode_is_monotone_across_pages() {
        let repo = seeded(23).await;

        for sort in ["price-low-high", "price-high-low", "newest", "rating", "popularity"] {
            let mut seen: Vec<Book> = Vec::new();
            for page in ["1", "2", "3"] {
                let query = ListingQuery::from_params(&params(&[
                    ("sort", sort),
                    ("limit", "8"),
                    ("page", page),
                ]));
                seen.extend(list_books(&repo, &query).await.unwrap().books);
            }
            assert_eq!(seen.len(), 23, "sort {sort} lost or repeated books");

            for pair in seen.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let ordered = match sort {
                    "price-low-high" => a.price <= b.price,
                    "price-high-low" => a.price >= b.price,
                    "newest" => a.publication_date >= b.publication_date,
                    "rating" => a.average_rating >= b.average_rating,
                    _ => a.created_at >= b.created_at,
                };
                assert!(ordered, "sort {sort} out of order: {} then {}", a.title, b.title);
            }
        }
    }
}
