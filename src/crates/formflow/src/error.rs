//! Error types for formflow
//!
//! Provides a unified error type for form, workflow and task operations.

use crate::store::StoreError;
use thiserror::Error;

/// Result type alias for formflow operations
pub type Result<T> = std::result::Result<T, FormflowError>;

/// Main error type for formflow operations
#[derive(Debug, Error)]
pub enum FormflowError {
    /// Relation field has no target form
    #[error("Relation field '{field_id}' has no target form configured")]
    NotConfigured { field_id: String },

    /// Referenced form, response, workflow or task is missing
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Blocking validation failure
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Collaborator I/O failure
    #[error("Transient fetch error: {0}")]
    Fetch(#[from] StoreError),

    /// Workflow status toggle that is not allowed
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormflowError {
    /// Create a NotFound error for the given entity kind
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        FormflowError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a Validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        FormflowError::Validation(msg.into())
    }

    /// Whether this error came from the store and may succeed when retried
    pub fn is_transient(&self) -> bool {
        matches!(self, FormflowError::Fetch(err) if !err.is_not_found())
    }

    /// Whether this error reports a missing record
    pub fn is_not_found(&self) -> bool {
        match self {
            FormflowError::NotFound { .. } => true,
            FormflowError::Fetch(err) => err.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = FormflowError::not_found("Task", "t-1");
        assert_eq!(err.to_string(), "Task not found: t-1");
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_store_errors_are_transient() {
        let err: FormflowError = StoreError::Connection("refused".to_string()).into();
        assert!(err.is_transient());

        let missing: FormflowError = StoreError::not_found("tasks/1").into();
        assert!(!missing.is_transient());
        assert!(missing.is_not_found());
    }
}
