//! Error types for schemata-catalog operations.

use std::collections::BTreeSet;
use std::time::Duration;

use http::StatusCode;
use schemata_core::Error as CoreError;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
///
/// Each variant maps to a distinct status class via [`CatalogError::status`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested object does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// A domain with this name is already registered.
    #[error("domain {name} already exists")]
    DuplicateName {
        /// The contested domain name.
        name: String,
    },

    /// The operation would violate uniqueness or immutability.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// The caller may not see or modify the object.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denial.
        message: String,
    },

    /// A payload is missing required fields or has the wrong shape.
    #[error("malformed payload: {message}")]
    MalformedPayload {
        /// Description of the schema violation.
        message: String,
    },

    /// A type tag has no registered payload codec.
    #[error("unknown object type: {tag}")]
    UnknownType {
        /// The unregistered tag.
        tag: String,
    },

    /// A search filter key is not on the allow-list.
    #[error("unrecognized filter: {key}")]
    UnrecognizedFilter {
        /// The rejected filter key.
        key: String,
    },

    /// The request itself is invalid.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// Domain compilation found referenced ids that do not resolve.
    #[error("compilation failed: missing referenced entities {}", format_ids(.missing))]
    MissingReferences {
        /// Exactly the referenced ids that could not be fetched.
        missing: BTreeSet<String>,
    },

    /// The document store failed.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the store failure.
        message: String,
    },

    /// A store call exceeded its deadline.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The store operation that timed out.
        operation: &'static str,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// An internal error that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl CatalogError {
    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Creates a malformed-payload error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Creates an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the HTTP status class for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::MissingReferences { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateName { .. }
            | Self::MalformedPayload { .. }
            | Self::UnknownType { .. }
            | Self::UnrecognizedFilter { .. }
            | Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Timeout { .. })
    }
}

fn format_ids(ids: &BTreeSet<String>) -> String {
    let joined: Vec<&str> = ids.iter().map(String::as_str).collect();
    format!("[{}]", joined.join(", "))
}

impl From<CoreError> for CatalogError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::NotFound(message) => Self::NotFound { message },
            CoreError::Conflict { id } => Self::Conflict {
                message: format!("object {id} already exists"),
            },
            CoreError::Timeout { operation, after } => Self::Timeout { operation, after },
            CoreError::InvalidId { message } | CoreError::InvalidInput(message) => {
                Self::InvalidRequest { message }
            }
            CoreError::Serialization { message } => Self::MalformedPayload { message },
            CoreError::Storage { message, .. } => Self::StoreUnavailable { message },
            CoreError::Internal { message } => Self::Internal { message },
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedPayload {
            message: value.to_string(),
        }
    }
}
