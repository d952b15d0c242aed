//! Store error types
//!
//! Every failure of the persistence collaborator is reported through
//! [`StoreError`]. sqlx errors are mapped onto the same variants so callers
//! never have to know which backend they are talking to.

use thiserror::Error;

/// Error raised by a [`DataStore`](super::DataStore) implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or pool failure
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Constraint violation (duplicate id, etc.)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Query could not be built or executed
    #[error("Query error: {0}")]
    Query(String),

    /// Stored document could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    /// Create a new NotFound error with context
    pub fn not_found(context: impl Into<String>) -> Self {
        StoreError::NotFound(context.into())
    }

    /// Create a new Query error
    pub fn query(msg: impl Into<String>) -> Self {
        StoreError::Query(msg.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                StoreError::NotFound("No matching row found in database".to_string())
            }
            sqlx::Error::ColumnNotFound(col) => {
                StoreError::Decode(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                StoreError::Decode(format!("Error decoding column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => StoreError::Decode(source.to_string()),
            sqlx::Error::Configuration(msg) => {
                StoreError::Connection(format!("Configuration error: {}", msg))
            }
            sqlx::Error::Io(err) => StoreError::Connection(format!("IO error: {}", err)),
            sqlx::Error::PoolTimedOut => {
                StoreError::Connection("Connection pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => {
                StoreError::Connection("Connection pool is closed".to_string())
            }
            sqlx::Error::Migrate(err) => StoreError::Migration(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::ConstraintViolation(db_err.message().to_string())
            }
            err => StoreError::Query(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = StoreError::not_found("tasks/123");
        assert!(err.is_not_found());
        assert!(format!("{}", err).contains("not found"));
    }

    #[test]
    fn test_sqlx_row_not_found_conversion() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_pool_closed_is_connection_error() {
        let err: StoreError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
