//! Error types and result aliases for schemata.
//!
//! This module defines the errors raised by the shared primitives and by the
//! catalog store port. Higher layers (the catalog) translate these into their
//! own taxonomy, so each variant here must stay distinguishable: a store
//! timeout is never reported as a missing document.

use std::fmt;
use std::time::Duration;

/// The result type used throughout schemata-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core and store-port operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// The requested document was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create would overwrite an existing document.
    #[error("conflict: document {id} already exists")]
    Conflict {
        /// The identifier that already exists.
        id: String,
    },

    /// A store operation did not complete within its deadline.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The store operation that timed out.
        operation: &'static str,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a not-found error for a document id.
    #[must_use]
    pub fn document_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound(format!("document {id}"))
    }

    /// Returns true if this error is a missing document.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_not_not_found() {
        let err = Error::Timeout {
            operation: "get",
            after: Duration::from_millis(250),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "get timed out after 250ms");
    }

    #[test]
    fn storage_error_keeps_source() {
        let io = std::io::Error::other("disk gone");
        let err = Error::storage_with_source("write failed", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
