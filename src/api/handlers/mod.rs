//! Route handlers and shared validation helpers.

pub mod auth;
pub mod health;
pub mod me;
pub mod principal;

use regex::Regex;

/// Lightweight email sanity check applied before touching the store.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Trim and lowercase, so lookups and the unique index see one spelling
/// per address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Password policy: at least 8 characters with upper, lower, and digit.
/// Returns the first violated rule so the caller gets a specific message.
#[must_use]
pub fn password_policy_error(password: &str) -> Option<&'static str> {
    if password.chars().count() < 8 {
        return Some("Password must be at least 8 characters long");
    }
    if !password.chars().any(char::is_uppercase) {
        return Some("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(char::is_lowercase) {
        return Some("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one digit");
    }
    None
}
