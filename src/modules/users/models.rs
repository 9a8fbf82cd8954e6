use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quire_db::Document;

use crate::utils::normalize_email;

/// Stored account. Emails are kept normalized so the unique key and lookups
/// agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "__v", default)]
    pub version: u64,
    pub email: String,
    /// Argon2 PHC string, never the plain password
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, password_hash: String, is_admin: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            version: 0,
            email: normalize_email(email),
            password_hash,
            is_admin,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";

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
        Some(normalize_email(&self.email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_normalizes_email() {
        let user = User::new(" Ada@Example.com", "hash".to_string(), false);
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.unique_key().as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn password_hash_is_stored_under_password() {
        let user = User::new("ada@example.com", "hash".to_string(), true);
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["password"], "hash");
        assert_eq!(json["isAdmin"], true);
        assert!(json.get("passwordHash").is_none());
    }
}
