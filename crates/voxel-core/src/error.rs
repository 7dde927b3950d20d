//! Error types for the voxel metadata store.

use thiserror::Error;

/// Result type alias using voxel's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for voxel operations.
///
/// Callers that only need the broad category (validation vs. conflict vs.
/// not-found) can use the `is_*` predicates instead of matching variants.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query `offset` parameter was not a non-negative integer.
    #[error("Invalid query offset value: {0}")]
    InvalidOffset(String),

    /// Query `limit` parameter fell outside the configured bounds.
    #[error("The query parameter limit {value} is out of range; limit must be between 1 and {max}")]
    LimitOutOfRange { value: i64, max: i64 },

    /// Query `fuzzymatching` parameter was not a boolean.
    #[error("Invalid fuzzy matching value: {0}")]
    InvalidBoolean(String),

    /// An `includefield` token did not resolve to a known attribute tag.
    #[error("Unknown include field attribute: {0}")]
    UnknownAttribute(String),

    /// Change feed pagination offset was negative.
    ///
    /// Deliberately distinct from the generic query-offset message so change
    /// feed consumers get an actionable error.
    #[error("Invalid change feed offset: {0}; offset must be a non-negative integer")]
    InvalidChangeFeedOffset(i64),

    /// A reindex start request carried no tag keys.
    #[error("The reindex tag key set must not be empty")]
    EmptyTagKeys,

    /// Resource already exists (duplicate attribute tag, overlapping reindex).
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Registering would push the live attribute count past the maximum.
    #[error("Registering {requested} attribute(s) would exceed the maximum of {max} extended attributes")]
    TooManyAttributes { requested: usize, max: usize },

    /// Study/series scope resolved to zero instances.
    #[error("No instances found for scope: {0}")]
    ScopeNotFound(String),

    /// At least one instance in a scope had no stored metadata.
    #[error("Metadata is incomplete for scope: {0}")]
    IncompleteMetadata(String),

    /// The orchestration engine returned an unexpected status code.
    #[error("Orchestration engine returned status {status}: {message}")]
    Transport { status: u16, message: String },

    /// HTTP/network request failed before a status code was received.
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error stems from malformed or out-of-range caller input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidOffset(_)
                | Error::LimitOutOfRange { .. }
                | Error::InvalidBoolean(_)
                | Error::UnknownAttribute(_)
                | Error::InvalidChangeFeedOffset(_)
                | Error::EmptyTagKeys
                | Error::TooManyAttributes { .. }
                | Error::InvalidInput(_)
        )
    }

    /// Whether this error is an idempotency signal rather than a hard failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }

    /// Whether this error indicates a missing or incomplete resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ScopeNotFound(_) | Error::IncompleteMetadata(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
