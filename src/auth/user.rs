//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account lifecycle state, stored as text.
///
/// `Deleted` is terminal and always checked first: a deleted account never
/// authenticates and its email can be reused by a new account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
    Deleted,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Deleted => "deleted",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// A user row. Profile fields mirror the API's whitelisted update surface.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub status: AccountStatus,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub timezone: String,
    pub currency: String,
    pub language: String,
    pub theme: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Display name with fallbacks: both names, one name, or the email.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.email.clone(),
        }
    }

    /// Whether this account may hold a session at all.
    #[must_use]
    pub const fn can_authenticate(&self) -> bool {
        matches!(self.status, AccountStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            status: AccountStatus::Active,
            is_verified: false,
            is_superuser: false,
            first_name: None,
            last_name: None,
            phone: None,
            timezone: "UTC".to_string(),
            currency: "USD".to_string(),
            language: "en".to_string(),
            theme: "light".to_string(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn full_name_falls_back_to_email() {
        let mut user = sample_user();
        assert_eq!(user.full_name(), "alice@example.com");

        user.first_name = Some("Alice".to_string());
        assert_eq!(user.full_name(), "Alice");

        user.last_name = Some("Doe".to_string());
        assert_eq!(user.full_name(), "Alice Doe");

        user.first_name = None;
        assert_eq!(user.full_name(), "Doe");
    }

    #[test]
    fn only_active_accounts_authenticate() {
        let mut user = sample_user();
        assert!(user.can_authenticate());

        user.status = AccountStatus::Inactive;
        assert!(!user.can_authenticate());

        user.status = AccountStatus::Deleted;
        assert!(!user.can_authenticate());
    }

    #[test]
    fn status_text_roundtrip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Inactive,
            AccountStatus::Deleted,
        ] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AccountStatus::parse("banned"), None);
    }
}
