//! Small helpers shared by the app modules.

/// Public name shown for a user: everything before the first `@`.
pub fn display_name(email: &str) -> String {
    let email = email.trim();
    email
        .split_once('@')
        .map_or(email, |(local, _)| local)
        .to_string()
}

/// Emails compare case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
