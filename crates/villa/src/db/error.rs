//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by the repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A unique constraint rejected the write.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether this error is a unique-constraint violation reported by the database.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Duplicate(_) => true,
            Self::Database(err) => is_unique_violation(err),
            Self::NotFound { .. } => false,
        }
    }
}

/// Check a raw sqlx error for a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::not_found("agent", "a1");
        assert_eq!(err.to_string(), "agent not found: a1");

        let err = StoreError::Duplicate("email".to_string());
        assert_eq!(err.to_string(), "duplicate email");
    }

    #[test]
    fn test_unique_violation_detection() {
        assert!(StoreError::Duplicate("x".into()).is_unique_violation());
        assert!(!StoreError::not_found("agent", "x").is_unique_violation());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_unique_violation());
    }
}
