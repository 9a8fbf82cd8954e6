//! Catalogue: listing, admin CRUD and reader reviews.

pub mod maintenance;
pub mod models;
pub mod payload;
pub mod query;
pub mod repository;
pub mod reviews;
pub mod routes;

use async_trait::async_trait;
use axum::Router;
use quire_kernel::{InitCtx, Module};
use serde_json::json;

use crate::state::AppState;

pub struct BooksModule {
    state: AppState,
}

impl BooksModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let total = self
            .state
            .books
            .count(&query::BookFilter::default())
            .await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = total,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn book_ref() -> serde_json::Value {
    json!({ "$ref": "#/components/schemas/Book" })
}

fn message_ref() -> serde_json::Value {
    json!({ "$ref": "#/components/schemas/Message" })
}

fn id_param() -> serde_json::Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    })
}

fn query_param(name: &str, description: &str) -> serde_json::Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "description": description,
        "schema": { "type": "string" }
    })
}

fn openapi_fragment() -> serde_json::Value {
    json!({
        "paths": paths(),
        "components": { "schemas": schemas() }
    })
}

fn paths() -> serde_json::Value {
    let bearer = json!([{ "bearerAuth": [] }]);

    json!({
        "/": {
            "get": {
                "summary": "List books",
                "tags": ["Books"],
                "parameters": [
                    query_param("search", "Case-insensitive title or author substring"),
                    query_param("category", "Category label or All"),
                    query_param("tag", "Tag label or All"),
                    query_param("sort", "price-low-high, price-high-low, newest, rating or popularity"),
                    query_param("page", "1-based page number"),
                    query_param("limit", "Page size, 1 to 100")
                ],
                "responses": {
                    "200": json_response("One page of matching books", json!({ "$ref": "#/components/schemas/BookPage" })),
                    "500": error_response("Failed to fetch books")
                }
            },
            "post": {
                "summary": "Create a book",
                "tags": ["Books"],
                "security": bearer,
                "requestBody": {
                    "required": true,
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookDraft" } } }
                },
                "responses": {
                    "201": json_response("Created book", book_ref()),
                    "400": error_response("Invalid book data or duplicate ISBN"),
                    "401": error_response("Missing or invalid token"),
                    "403": error_response("Admin access required")
                }
            }
        },
        "/{id}": {
            "get": {
                "summary": "Get a book",
                "tags": ["Books"],
                "parameters": [id_param()],
                "responses": {
                    "200": json_response("The book", book_ref()),
                    "400": error_response("Invalid book id"),
                    "404": error_response("Book not found")
                }
            },
            "put": {
                "summary": "Update a book",
                "tags": ["Books"],
                "security": bearer,
                "parameters": [id_param()],
                "requestBody": {
                    "required": true,
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookDraft" } } }
                },
                "responses": {
                    "200": json_response("Updated book", book_ref()),
                    "400": error_response("Invalid book data"),
                    "403": error_response("Admin access required"),
                    "404": error_response("Book not found")
                }
            },
            "delete": {
                "summary": "Delete a book",
                "tags": ["Books"],
                "security": bearer,
                "parameters": [id_param()],
                "responses": {
                    "200": json_response("Book deleted", message_ref()),
                    "403": error_response("Admin access required"),
                    "404": error_response("Book not found")
                }
            }
        },
        "/{id}/reviews": {
            "post": {
                "summary": "Review a book",
                "tags": ["Reviews"],
                "security": bearer,
                "parameters": [id_param()],
                "requestBody": {
                    "required": true,
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ReviewInput" } } }
                },
                "responses": {
                    "201": json_response("Review added", message_ref()),
                    "400": error_response("Invalid review or book already reviewed"),
                    "401": error_response("Missing or invalid token"),
                    "404": error_response("Book not found")
                }
            },
            "delete": {
                "summary": "Remove your review",
                "tags": ["Reviews"],
                "security": bearer,
                "parameters": [id_param()],
                "responses": {
                    "200": json_response("Review removed", message_ref()),
                    "401": error_response("Missing or invalid token"),
                    "404": error_response("Book not found or no review to delete")
                }
            }
        },
        "/health": {
            "get": {
                "summary": "Books health check",
                "tags": ["Books"],
                "responses": {
                    "200": {
                        "description": "OK",
                        "content": { "text/plain": { "schema": { "type": "string" } } }
                    }
                }
            }
        }
    })
}

fn schemas() -> serde_json::Value {
    json!({
        "Review": {
            "type": "object",
            "properties": {
                "user": { "type": "string", "format": "uuid" },
                "name": { "type": "string" },
                "rating": { "type": "integer", "minimum": 0, "maximum": 5 },
                "comment": { "type": "string" },
                "createdAt": { "type": "string", "format": "date-time" }
            },
            "required": ["user", "name", "rating", "comment", "createdAt"]
        },
        "Book": book_schema(),
        "BookDraft": {
            "type": "object",
            "description": "Catalogue fields of a Book; all required on create, all optional on update",
            "required": [
                "title", "author", "isbn", "publisher", "publicationDate", "format",
                "numberOfPages", "image", "category", "description", "price", "availabilityStatus"
            ]
        },
        "BookPage": {
            "type": "object",
            "properties": {
                "books": { "type": "array", "items": book_ref() },
                "total": { "type": "integer" },
                "page": { "type": "integer" },
                "pages": { "type": "integer" }
            },
            "required": ["books", "total", "page", "pages"]
        },
        "ReviewInput": {
            "type": "object",
            "properties": {
                "rating": { "type": "integer", "minimum": 0, "maximum": 5 },
                "comment": { "type": "string" }
            },
            "required": ["rating", "comment"]
        },
        "Message": {
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"]
        }
    })
}

fn book_schema() -> serde_json::Value {
    let formats: Vec<&str> = models::Format::ALL.iter().map(|v| v.label()).collect();
    let categories: Vec<&str> = models::Category::ALL.iter().map(|v| v.label()).collect();
    let availability: Vec<&str> = models::Availability::ALL.iter().map(|v| v.label()).collect();
    let tags: Vec<&str> = models::Tag::ALL.iter().map(|v| v.label()).collect();

    json!({
        "type": "object",
        "properties": {
            "_id": { "type": "string", "format": "uuid" },
            "__v": { "type": "integer" },
            "title": { "type": "string" },
            "author": { "type": "string" },
            "isbn": { "type": "string" },
            "publisher": { "type": "string" },
            "publicationDate": { "type": "string", "format": "date" },
            "format": { "type": "string", "enum": formats },
            "numberOfPages": { "type": "integer", "minimum": 1 },
            "image": { "type": "string", "format": "uri" },
            "category": { "type": "string", "enum": categories },
            "description": { "type": "string" },
            "price": { "type": "number", "minimum": 0 },
            "availabilityStatus": { "type": "string", "enum": availability },
            "tag": { "type": "string", "enum": tags },
            "language": { "type": "string" },
            "dimensions": { "type": "string" },
            "weight": { "type": "string" },
            "reviews": { "type": "array", "items": { "$ref": "#/components/schemas/Review" } },
            "averageRating": { "type": "number" },
            "numReviews": { "type": "integer" },
            "createdAt": { "type": "string", "format": "date-time" },
            "updatedAt": { "type": "string", "format": "date-time" }
        },
        "required": ["_id", "title", "author", "isbn", "price", "category", "averageRating", "numReviews"]
    })
}
