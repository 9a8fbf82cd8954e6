#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use quire_app::AppState;
use quire_kernel::settings::Settings;

#[derive(Clone)]
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let settings = Settings::default();
        let state = AppState::in_memory(&settings.auth);
        let router = quire_app::router(&state, &settings).expect("router builds");
        Self { state, router }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    /// Token for an admin that exists only in the token.
    pub fn admin_token(&self) -> String {
        self.state
            .tokens
            .issue(Uuid::now_v7(), "admin@example.com", true)
            .unwrap()
    }

    /// Register a reader through the API and return `(token, user id)`.
    pub async fn register(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "secret123",
                    "confirmPassword": "secret123"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["userId"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_book(&self, token: &str, draft: Value) -> Value {
        let (status, body) = self
            .send(Method::POST, "/api/books", Some(token), Some(draft))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

pub fn draft(title: &str, isbn: &str) -> Value {
    json!({
        "title": title,
        "author": "N. K. Jemisin",
        "isbn": isbn,
        "publisher": "Orbit",
        "publicationDate": "2015-08-04",
        "format": "Paperback",
        "numberOfPages": 468,
        "image": "https://covers.example.com/fifth-season.jpg",
        "category": "Fiction",
        "description": "The world ends, again.",
        "price": 15.99,
        "availabilityStatus": "In Stock",
        "tag": "Bestseller"
    })
}
