//! Admin-supplied catalogue data and its validation.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{Availability, Book, Category, Format, Tag};

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub error: String,
}

impl FieldIssue {
    fn new(field: &'static str, error: impl Into<String>) -> Self {
        Self {
            field,
            error: error.into(),
        }
    }
}

/// Everything needed to create a book. Enumerations are checked by serde.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publisher: String,
    pub publication_date: NaiveDate,
    pub format: Format,
    pub number_of_pages: u32,
    pub image: String,
    pub category: Category,
    pub description: String,
    pub price: f64,
    pub availability_status: Availability,
    #[serde(default)]
    pub tag: Tag,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
}

impl BookDraft {
    pub fn validate(&self) -> Result<(), Vec<FieldIssue>> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
            ("publisher", &self.publisher),
            ("description", &self.description),
        ] {
            check_required(&mut issues, field, value);
        }
        check_pages(&mut issues, self.number_of_pages);
        check_image(&mut issues, &self.image);
        check_price(&mut issues, self.price);

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Build the stored document. Id and version are assigned by the store.
    pub fn into_book(self) -> Book {
        let now = Utc::now();
        Book {
            id: Uuid::nil(),
            version: 0,
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            isbn: self.isbn.trim().to_string(),
            publisher: self.publisher.trim().to_string(),
            publication_date: self.publication_date,
            format: self.format,
            number_of_pages: self.number_of_pages,
            image: self.image.trim().to_string(),
            category: self.category,
            description: self.description,
            price: self.price,
            availability_status: self.availability_status,
            tag: self.tag,
            language: non_blank(self.language),
            dimensions: non_blank(self.dimensions),
            weight: non_blank(self.weight),
            reviews: Vec::new(),
            average_rating: 0.0,
            num_reviews: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. Reviews and their aggregates are not writable here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub format: Option<Format>,
    pub number_of_pages: Option<u32>,
    pub image: Option<String>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub availability_status: Option<Availability>,
    pub tag: Option<Tag>,
    pub language: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
}

impl BookPatch {
    pub fn validate(&self) -> Result<(), Vec<FieldIssue>> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
            ("publisher", &self.publisher),
            ("description", &self.description),
        ] {
            if let Some(value) = value {
                check_required(&mut issues, field, value);
            }
        }
        if let Some(pages) = self.number_of_pages {
            check_pages(&mut issues, pages);
        }
        if let Some(image) = &self.image {
            check_image(&mut issues, image);
        }
        if let Some(price) = self.price {
            check_price(&mut issues, price);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    pub fn apply(&self, book: &mut Book) {
        let trimmed = |value: &String| value.trim().to_string();

        if let Some(v) = &self.title {
            book.title = trimmed(v);
        }
        if let Some(v) = &self.author {
            book.author = trimmed(v);
        }
        if let Some(v) = &self.isbn {
            book.isbn = trimmed(v);
        }
        if let Some(v) = &self.publisher {
            book.publisher = trimmed(v);
        }
        if let Some(v) = self.publication_date {
            book.publication_date = v;
        }
        if let Some(v) = self.format {
            book.format = v;
        }
        if let Some(v) = self.number_of_pages {
            book.number_of_pages = v;
        }
        if let Some(v) = &self.image {
            book.image = trimmed(v);
        }
        if let Some(v) = self.category {
            book.category = v;
        }
        if let Some(v) = &self.description {
            book.description = v.clone();
        }
        if let Some(v) = self.price {
            book.price = v;
        }
        if let Some(v) = self.availability_status {
            book.availability_status = v;
        }
        if let Some(v) = self.tag {
            book.tag = v;
        }
        // An empty string clears an optional attribute.
        if let Some(v) = &self.language {
            book.language = non_blank(Some(v.clone()));
        }
        if let Some(v) = &self.dimensions {
            book.dimensions = non_blank(Some(v.clone()));
        }
        if let Some(v) = &self.weight {
            book.weight = non_blank(Some(v.clone()));
        }
        book.updated_at = Utc::now();
    }
}

/// Human-readable summary of rejected fields.
pub fn describe(issues: &[FieldIssue]) -> String {
    let fields: Vec<&str> = issues.iter().map(|issue| issue.field).collect();
    format!("Invalid book data: {}", fields.join(", "))
}

fn check_required(issues: &mut Vec<FieldIssue>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        issues.push(FieldIssue::new(field, "required"));
    }
}

fn check_pages(issues: &mut Vec<FieldIssue>, pages: u32) {
    if pages == 0 {
        issues.push(FieldIssue::new("numberOfPages", "must be a positive integer"));
    }
}

fn check_price(issues: &mut Vec<FieldIssue>, price: f64) {
    if !price.is_finite() || price < 0.0 {
        issues.push(FieldIssue::new("price", "must be a non-negative number"));
    }
}

fn check_image(issues: &mut Vec<FieldIssue>, image: &str) {
    match url::Url::parse(image.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(_) => issues.push(FieldIssue::new("image", "must be an http(s) URL")),
        Err(err) => issues.push(FieldIssue::new("image", format!("invalid URL: {err}"))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
