//! HTTP handlers of the books module.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use quire_authz::{AdminUser, AuthUser};
use quire_db::StoreError;
use quire_http::{ApiJson, ApiQuery, AppError};

use super::models::Book;
use super::payload::{describe, BookDraft, BookPatch, FieldIssue};
use super::query::{list_books, BookPage, ListingParams, ListingQuery};
use super::reviews::{remove_review, submit_review, ReviewInput, Reviewer};
use crate::state::AppState;

/// `{ "message": ... }` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/health", get(health_check))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/reviews", post(add_review).delete(delete_review))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListingParams>,
) -> Result<ApiJson<BookPage>, AppError> {
    let query = ListingQuery::from_params(&params);
    let page = list_books(state.books.as_ref(), &query)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "book listing failed");
            AppError::internal("Failed to fetch books")
        })?;
    Ok(ApiJson(page))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiJson<Book>, AppError> {
    let id = parse_book_id(&id)?;
    let book = state
        .books
        .get(id)
        .await
        .map_err(store_error)?
        .ok_or_else(book_not_found)?;
    Ok(ApiJson(book))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(draft): ApiJson<BookDraft>,
) -> Result<(StatusCode, ApiJson<Book>), AppError> {
    draft.validate().map_err(invalid_book)?;

    let book = state
        .books
        .insert(draft.into_book())
        .await
        .map_err(store_error)?;

    tracing::info!(book_id = %book.id, admin_id = %admin.user_id, "book created");
    Ok((StatusCode::CREATED, ApiJson(book)))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<BookPatch>,
) -> Result<ApiJson<Book>, AppError> {
    let id = parse_book_id(&id)?;
    patch.validate().map_err(invalid_book)?;

    // Review writes may bump the version between our read and write.
    let mut attempts = 0;
    let book = loop {
        attempts += 1;
        let mut book = state
            .books
            .get(id)
            .await
            .map_err(store_error)?
            .ok_or_else(book_not_found)?;
        patch.apply(&mut book);

        match state.books.replace(book).await {
            Ok(saved) => break saved,
            Err(StoreError::VersionConflict { .. }) if attempts < 3 => continue,
            Err(err) => return Err(store_error(err)),
        }
    };

    tracing::info!(book_id = %book.id, admin_id = %admin.user_id, "book updated");
    Ok(ApiJson(book))
}

async fn destroy(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<ApiJson<Message>, AppError> {
    let id = parse_book_id(&id)?;
    state
        .books
        .delete(id)
        .await
        .map_err(store_error)?
        .ok_or_else(book_not_found)?;

    tracing::info!(book_id = %id, admin_id = %admin.user_id, "book deleted");
    Ok(ApiJson(Message {
        message: "Book deleted",
    }))
}

async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<(StatusCode, ApiJson<Message>), AppError> {
    let id = parse_book_id(&id)?;
    let reviewer = Reviewer {
        user_id: user.user_id,
        email: &user.email,
    };
    submit_review(state.books.as_ref(), id, reviewer, &input).await?;

    Ok((
        StatusCode::CREATED,
        ApiJson(Message {
            message: "Review added",
        }),
    ))
}

async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<ApiJson<Message>, AppError> {
    let id = parse_book_id(&id)?;
    remove_review(state.books.as_ref(), id, user.user_id).await?;

    Ok(ApiJson(Message {
        message: "Review removed",
    }))
}

fn parse_book_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request("Invalid book id"))
}

fn book_not_found() -> AppError {
    AppError::not_found("Book not found")
}

fn invalid_book(issues: Vec<FieldIssue>) -> AppError {
    let message = describe(&issues);
    let details = issues
        .into_iter()
        .map(|issue| serde_json::json!({"field": issue.field, "error": issue.error}))
        .collect();
    AppError::validation(details, message)
}

fn store_error(err: StoreError) -> AppError {
    match err {
        StoreError::DuplicateKey { key, .. } => AppError::conflict(
            vec![serde_json::json!({"field": "isbn", "value": key})],
            "A book with this ISBN already exists",
        ),
        StoreError::NotFound(_) => book_not_found(),
        other => AppError::Internal(anyhow::Error::new(other).context("Book storage failed")),
    }
}
