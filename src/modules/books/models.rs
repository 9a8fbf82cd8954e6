use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quire_db::Document;

/// A value that is not one of an enumeration's labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Closed enumeration serialized as its human-readable label.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident ($kind:literal) { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "&'static str", try_from = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.label()
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                // Typed apostrophes stand in for the typographic ones in labels.
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == value || v.label().replace('’', "'") == value)
                    .ok_or_else(|| UnknownLabel {
                        kind: $kind,
                        value: value.to_string(),
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownLabel;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labelled_enum! {
    /// Shelf a book is listed under.
    Category ("category") {
        Fiction => "Fiction",
        NonFiction => "Non-Fiction",
        BiographiesMemoirs => "Biographies & Memoirs",
        ChildrensEducational => "Children’s & Educational Books",
        BusinessEconomicsSelfHelp => "Business, Economics & Self-Help",
        ScienceTechnologyNature => "Science, Technology & Nature",
        HistoryPoliticsSociety => "History, Politics & Society",
        ArtDesignLiterature => "Art, Design & Literature",
        ReligionSpiritualityPhilosophy => "Religion, Spirituality & Philosophy",
        ComicsMangaGraphicNovels => "Comics, Manga & Graphic Novels",
    }
}

labelled_enum! {
    /// Promotional tag; `None` on the wire means untagged.
    Tag ("tag") {
        Bestseller => "Bestseller",
        Trending => "Trending",
        NewRelease => "New Release",
        Untagged => "None",
    }
}

impl Default for Tag {
    fn default() -> Self {
        Tag::Untagged
    }
}

labelled_enum! {
    Format ("format") {
        Hardcover => "Hardcover",
        Paperback => "Paperback",
        EBook => "eBook",
    }
}

labelled_enum! {
    Availability ("availability status") {
        InStock => "In Stock",
        OutOfStock => "Out of Stock",
        PreOrder => "Pre-Order",
    }
}

/// A reader's rating of a book, embedded in the book document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user: Uuid,
    /// Email local-part of the reviewer when the review was written
    pub name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Catalogue entry with its embedded reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "__v", default)]
    pub version: u64,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub num_reviews: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn review_by(&self, user: Uuid) -> Option<&Review> {
        self.reviews.iter().find(|review| review.user == user)
    }

    /// Recompute `numReviews` and `averageRating` from the review list.
    pub fn refresh_review_stats(&mut self) {
        self.num_reviews = self.reviews.len() as u32;
        self.average_rating = if self.reviews.is_empty() {
            0.0
        } else {
            let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            round_rating(f64::from(sum) / self.reviews.len() as f64)
        };
    }
}

fn round_rating(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// ISBNs compare without hyphens, spaces or letter case.
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl Document for Book {
    const COLLECTION: &'static str = "books";

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
        Some(normalize_isbn(&self.isbn))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn book(title: &str, isbn: &str) -> Book {
        let now = Utc::now();
        Book {
            id: Uuid::nil(),
            version: 0,
            title: title.to_string(),
            author: "Test Author".to_string(),
            isbn: isbn.to_string(),
            publisher: "Test House".to_string(),
            publication_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            format: Format::Paperback,
            number_of_pages: 320,
            image: "https://covers.example.com/test.jpg".to_string(),
            category: Category::Fiction,
            description: "A test book.".to_string(),
            price: 10.0,
            availability_status: Availability::InStock,
            tag: Tag::Untagged,
            language: None,
            dimensions: None,
            weight: None,
            reviews: Vec::new(),
            average_rating: 0.0,
            num_reviews: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn review(rating: u8) -> Review {
        Review {
            user: Uuid::now_v7(),
            name: "reader".to_string(),
            rating,
            comment: "fine".to_string(),
            created_at: Utc::now(),
        }
    }
}
