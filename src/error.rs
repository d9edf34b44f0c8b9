//! Error types for feedcheck.

use thiserror::Error;

/// Common error type for feedcheck.
#[derive(Error, Debug)]
pub enum FeedCheckError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A feed with the same URL is already registered.
    #[error("feed already registered: {0}")]
    Duplicate(String),

    /// The feed could not be fetched or parsed while adding it.
    #[error("failed to fetch feed: {0}")]
    FetchFailed(String),

    /// A worker task of the check cycle was lost (panicked or cancelled).
    #[error("worker failure: {0}")]
    Worker(String),
}

impl From<sqlx::Error> for FeedCheckError {
    fn from(e: sqlx::Error) -> Self {
        FeedCheckError::Database(e.to_string())
    }
}

/// Result type alias for feedcheck operations.
pub type Result<T> = std::result::Result<T, FeedCheckError>;
