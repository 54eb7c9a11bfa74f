//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use anna_paris_core::{Email, UserId, UserRole};

/// Email of the shared row that owns all guest orders.
pub const GUEST_EMAIL: &str = "guest@annaparis.com";

/// Display name of the shared guest row.
pub const GUEST_NAME: &str = "Guest Customer";

/// A site user (customer or admin).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name to show for this user, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }

    /// Whether this is the shared guest row.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.email.as_str() == GUEST_EMAIL
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(email: &str, name: Option<&str>) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse(email).unwrap(),
            name: name.map(String::from),
            role: UserRole::Customer,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_local_part() {
        assert_eq!(user("mali@example.com", Some("Mali")).display_name(), "Mali");
        assert_eq!(user("mali@example.com", Some("  ")).display_name(), "mali");
        assert_eq!(user("mali@example.com", None).display_name(), "mali");
    }

    #[test]
    fn test_guest_row() {
        assert!(user(GUEST_EMAIL, Some(GUEST_NAME)).is_guest());
        assert!(!user("mali@example.com", None).is_guest());
    }
}
