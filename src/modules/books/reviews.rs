//! One review per reader, with the book's rating aggregates kept in step.
//!
//! Every mutation is a read-modify-write of the whole book guarded by the
//! store's version check. A write that loses the race reloads the book and
//! re-runs the duplicate check, so concurrent submissions by one reader can
//! never both land.

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use quire_db::StoreError;
use quire_http::AppError;

use super::models::{Book, Review};
use super::repository::BookRepository;
use crate::utils::display_name;

pub const MAX_RATING: i64 = 5;

/// Rounds of reload-and-retry after losing a version race.
const MAX_WRITE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

/// Who is writing the review.
#[derive(Debug, Clone, Copy)]
pub struct Reviewer<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Rating must be an integer between 0 and 5")]
    InvalidRating(i64),

    #[error("Comment is required")]
    EmptyComment,

    #[error("Book not found")]
    BookNotFound,

    #[error("Book already reviewed")]
    AlreadyReviewed,

    #[error("No review to delete")]
    NoReview,

    #[error("gave up after {0} conflicting writes")]
    Contention(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::InvalidRating(rating) => AppError::validation(
                vec![serde_json::json!({"field": "rating", "value": rating})],
                err.to_string(),
            ),
            ReviewError::EmptyComment => AppError::validation(
                vec![serde_json::json!({"field": "comment", "error": "required"})],
                err.to_string(),
            ),
            ReviewError::BookNotFound | ReviewError::NoReview => AppError::not_found(err.to_string()),
            ReviewError::AlreadyReviewed => AppError::conflict(vec![], err.to_string()),
            ReviewError::Contention(_) | ReviewError::Store(_) => {
                AppError::Internal(anyhow::Error::new(err).context("Failed to update reviews"))
            }
        }
    }
}

/// Append the reviewer's review and refresh the book's aggregates.
pub async fn submit_review(
    repo: &dyn BookRepository,
    book_id: Uuid,
    reviewer: Reviewer<'_>,
    input: &ReviewInput,
) -> Result<Book, ReviewError> {
    let rating = u8::try_from(input.rating)
        .ok()
        .filter(|r| i64::from(*r) <= MAX_RATING)
        .ok_or(ReviewError::InvalidRating(input.rating))?;
    let comment = input.comment.trim();
    if comment.is_empty() {
        return Err(ReviewError::EmptyComment);
    }

    let book = update_book(repo, book_id, |book| {
        if book.review_by(reviewer.user_id).is_some() {
            return Err(ReviewError::AlreadyReviewed);
        }
        book.reviews.push(Review {
            user: reviewer.user_id,
            name: display_name(reviewer.email),
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    })
    .await?;

    tracing::info!(
        book_id = %book_id,
        user_id = %reviewer.user_id,
        rating,
        average_rating = book.average_rating,
        num_reviews = book.num_reviews,
        "review added"
    );
    Ok(book)
}

/// Remove the caller's own review and refresh the book's aggregates.
pub async fn remove_review(
    repo: &dyn BookRepository,
    book_id: Uuid,
    user_id: Uuid,
) -> Result<Book, ReviewError> {
    let book = update_book(repo, book_id, |book| {
        let before = book.reviews.len();
        book.reviews.retain(|review| review.user != user_id);
        if book.reviews.len() == before {
            return Err(ReviewError::NoReview);
        }
        Ok(())
    })
    .await?;

    tracing::info!(
        book_id = %book_id,
        user_id = %user_id,
        average_rating = book.average_rating,
        num_reviews = book.num_reviews,
        "review removed"
    );
    Ok(book)
}

async fn update_book<F>(
    repo: &dyn BookRepository,
    book_id: Uuid,
    mut mutate: F,
) -> Result<Book, ReviewError>
where
    F: FnMut(&mut Book) -> Result<(), ReviewError> + Send,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let mut book = repo.get(book_id).await?.ok_or(ReviewError::BookNotFound)?;

        mutate(&mut book)?;
        book.refresh_review_stats();
        book.updated_at = Utc::now();

        match repo.replace(book).await {
            Ok(saved) => return Ok(saved),
            Err(StoreError::VersionConflict { .. }) => {
                tracing::debug!(book_id = %book_id, attempt, "review write lost a version race, retrying");
            }
            Err(StoreError::NotFound(_)) => return Err(ReviewError::BookNotFound),
            Err(err) => return Err(err.into()),
        }
    }

    tracing::warn!(book_id = %book_id, "review write abandoned after repeated conflicts");
    Err(ReviewError::Contention(MAX_WRITE_ATTEMPTS))
}
