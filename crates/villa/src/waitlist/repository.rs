//! Waitlist repository for database operations.

use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::db::{self, StoreError, StoreResult, is_unique_violation};

use super::WaitlistEntry;

/// Repository for waitlist database operations.
#[derive(Debug, Clone)]
pub struct WaitlistRepository {
    pool: SqlitePool,
}

impl WaitlistRepository {
    /// Create a new waitlist repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add an email to the waitlist.
    ///
    /// Returns [`StoreError::Duplicate`] when the email is already on it.
    #[instrument(skip(self, email))]
    pub async fn join(&self, email: &str) -> StoreResult<WaitlistEntry> {
        let entry = WaitlistEntry {
            id: db::generate_id("wl"),
            email: email.trim().to_string(),
            created_at: db::now(),
        };

        sqlx::query("INSERT INTO waitlist (id, email, created_at) VALUES (?, ?, ?)")
            .bind(&entry.id)
            .bind(&entry.email)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Duplicate(format!("email {}", entry.email))
                } else {
                    err.into()
                }
            })?;

        debug!("Waitlist entry {} created", entry.id);
        Ok(entry)
    }

    /// Number of entries on the waitlist.
    #[instrument(skip(self))]
    pub async fn count(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM waitlist")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let repo = WaitlistRepository::new(db.pool().clone());

        repo.join("fan@villa.tv").await.unwrap();
        let err = repo.join(" fan@villa.tv ").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
