//! Waitlist sign-ups.

mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub use repository::WaitlistRepository;

/// Waitlist entry from database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Request to join the waitlist.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinWaitlistRequest {
    #[serde(default)]
    pub email: String,
}

/// Minimal email check: an `@` somewhere in the trimmed input.
pub fn is_plausible_email(email: &str) -> bool {
    email.trim().contains('@')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_plausible_email() {
        assert!(is_plausible_email("jess@villa.tv"));
        assert!(is_plausible_email("@"));
        assert!(!is_plausible_email("jess.villa.tv"));
        assert!(!is_plausible_email("   "));
    }
}
