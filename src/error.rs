//! Error types for Ember.
//!
//! Every fallible operation in the crate returns [`Result`], whose error is
//! the crate-wide [`EmberError`].

use thiserror::Error;

/// A single document that failed analysis inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    /// External ID of the document.
    pub doc_id: String,
    /// Reason reported by the analysis step.
    pub reason: String,
}

impl std::fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.doc_id, self.reason)
    }
}

/// Main error type for Ember operations.
#[derive(Error, Debug)]
pub enum EmberError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Index is closed")]
    Closed,

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Batch rejected: {} document(s) failed analysis", .failures.len())]
    BatchRejected { failures: Vec<DocumentFailure> },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Ember operations.
pub type Result<T> = std::result::Result<T, EmberError>;

impl EmberError {
    pub fn analysis(msg: impl Into<String>) -> Self {
        EmberError::Analysis(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        EmberError::InvalidArgument(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        EmberError::InvalidConfig(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        EmberError::Index(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        EmberError::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        EmberError::Internal(msg.into())
    }

    /// Whether the failure is tied to the index lifecycle rather than the
    /// content of the request.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, EmberError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EmberError::index("segment id counter overflow");
        assert_eq!(err.to_string(), "Index error: segment id counter overflow");
        assert_eq!(EmberError::Closed.to_string(), "Index is closed");
    }

    #[test]
    fn test_batch_rejected_display() {
        let err = EmberError::BatchRejected {
            failures: vec![
                DocumentFailure {
                    doc_id: "a".to_string(),
                    reason: "bad".to_string(),
                },
                DocumentFailure {
                    doc_id: "b".to_string(),
                    reason: "worse".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Batch rejected: 2 document(s) failed analysis"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: EmberError = anyhow::anyhow!("tokenizer exploded").into();
        assert_eq!(err.to_string(), "tokenizer exploded");
        assert!(!err.is_shutdown());
        assert!(EmberError::Closed.is_shutdown());
    }
}
