//! Error types for prospect.

use thiserror::Error;

/// Result type alias using prospect's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for prospect operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Search job not found
    #[error("Search not found: {0}")]
    SearchNotFound(i64),

    /// Lead not found
    #[error("Lead not found: {0}")]
    LeadNotFound(i64),

    /// Invalid input (malformed payload, missing field, blank value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested state transition is not legal from the current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Optimistic concurrency check failed or the action was already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The automation tool did not accept a trigger. The search has already
    /// been moved to `error` when this is returned.
    #[error("Automation trigger failed for search {search_id}: {message}")]
    Trigger { search_id: i64, message: String },

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Authentication failed (shared secret mismatch)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
