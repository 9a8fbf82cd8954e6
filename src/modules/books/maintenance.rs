//! Bulk catalogue operations driven from the operator CLI.

use chrono::NaiveDate;
use serde::Serialize;

use quire_db::StoreError;

use super::models::Book;
use super::payload::{describe, BookDraft};
use super::repository::BookRepository;

/// Which books a prune removes. Every given condition must hold; a rule with
/// no conditions matches nothing.
#[derive(Debug, Clone, Default)]
pub struct PruneRule {
    pub published_before: Option<NaiveDate>,
    pub author: Option<String>,
}

impl PruneRule {
    pub fn is_empty(&self) -> bool {
        self.published_before.is_none() && self.author.is_none()
    }

    pub fn matches(&self, book: &Book) -> bool {
        if self.is_empty() {
            return false;
        }
        let date_ok = self
            .published_before
            .map_or(true, |cutoff| book.publication_date < cutoff);
        let author_ok = self
            .author
            .as_deref()
            .map_or(true, |author| book.author.trim().eq_ignore_ascii_case(author.trim()));
        date_ok && author_ok
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Insert each record that deserializes into a valid draft. Invalid records
/// and duplicate ISBNs are counted as skipped; storage failures abort.
pub async fn import_books(
    repo: &dyn BookRepository,
    records: Vec<serde_json::Value>,
) -> Result<ImportReport, StoreError> {
    let mut report = ImportReport::default();

    for (index, record) in records.into_iter().enumerate() {
        let draft: BookDraft = match serde_json::from_value(record) {
            Ok(draft) => draft,
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping unreadable book record");
                report.skipped += 1;
                continue;
            }
        };
        if let Err(issues) = draft.validate() {
            tracing::warn!(index, reason = %describe(&issues), "skipping invalid book record");
            report.skipped += 1;
            continue;
        }

        match repo.insert(draft.into_book()).await {
            Ok(book) => {
                tracing::debug!(index, book_id = %book.id, "imported book");
                report.inserted += 1;
            }
            Err(StoreError::DuplicateKey { key, .. }) => {
                tracing::warn!(index, isbn = %key, "skipping duplicate isbn");
                report.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    tracing::info!(inserted = report.inserted, skipped = report.skipped, "book import finished");
    Ok(report)
}

/// Hard-delete every book the rule matches.
pub async fn prune_books(repo: &dyn BookRepository, rule: &PruneRule) -> Result<usize, StoreError> {
    if rule.is_empty() {
        return Ok(0);
    }
    let removed = repo.delete_matching(rule).await?;
    tracing::info!(
        removed,
        published_before = ?rule.published_before,
        author = ?rule.author,
        "pruned books"
    );
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::fixtures;
    use crate::modules::books::query::{BookFilter, SortMode};
    use crate::modules::books::repository::CollectionBookRepository;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(title: &str, isbn: &str) -> serde_json::Value {
        json!({
            "title": title,
            "author": "Octavia E. Butler",
            "isbn": isbn,
            "publisher": "Four Walls",
            "publicationDate": "1993-10-01",
            "format": "Hardcover",
            "numberOfPages": 345,
            "image": "https://covers.example.com/sower.jpg",
            "category": "Fiction",
            "description": "Earthseed.",
            "price": 18.0,
            "availabilityStatus": "In Stock",
            "tag": "Bestseller"
        })
    }

    #[test]
    fn empty_rule_matches_nothing() {
        let book = fixtures::book("Any", "1");
        assert!(!PruneRule::default().matches(&book));
    }

    #[test]
    fn conditions_combine_with_and() {
        let mut book = fixtures::book("Old", "1");
        book.publication_date = date(1990, 5, 1);

        let by_date = PruneRule {
            published_before: Some(date(2000, 1, 1)),
            author: None,
        };
        assert!(by_date.matches(&book));

        let by_both = PruneRule {
            published_before: Some(date(2000, 1, 1)),
            author: Some("someone else".to_string()),
        };
        assert!(!by_both.matches(&book));

        let by_author = PruneRule {
            published_before: None,
            author: Some("test author".to_string()),
        };
        assert!(by_author.matches(&book));
    }

    #[tokio::test]
    async fn import_counts_inserted_and_skipped() {
        let repo = CollectionBookRepository::in_memory();
        let mut invalid = record("Broken", "isbn-3");
        invalid["numberOfPages"] = json!(0);

        let report = import_books(
            &repo,
            vec![
                record("Parable of the Sower", "isbn-1"),
                record("Parable of the Talents", "isbn-2"),
                record("Sower, again", "ISBN 1"),
                invalid,
                json!({"title": "no other fields"}),
            ],
        )
        .await
        .unwrap();

        assert_eq!(report, ImportReport { inserted: 2, skipped: 3 });
        assert_eq!(repo.count(&BookFilter::default()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn prune_removes_only_matching_books() {
        let repo = CollectionBookRepository::in_memory();
        for (isbn, year) in [("a", 1980), ("b", 1999), ("c", 2015)] {
            let mut book = fixtures::book(isbn, isbn);
            book.publication_date = date(year, 1, 1);
            repo.insert(book).await.unwrap();
        }

        let rule = PruneRule {
            published_before: Some(date(2000, 1, 1)),
            author: None,
        };
        assert_eq!(prune_books(&repo, &rule).await.unwrap(), 2);

        let left = repo
            .find(&BookFilter::default(), SortMode::default(), 0, 10)
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].isbn, "c");

        assert_eq!(prune_books(&repo, &PruneRule::default()).await.unwrap(), 0);
    }
}
