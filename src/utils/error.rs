//! Error Handling
//!
//! Unified error types for the client.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::services::remote::RemoteError;

/// Client-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors (pool, schema, storage quota)
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors bubbled up from the core crate
    #[error(transparent)]
    Core(#[from] clear_ai_core::CoreError),

    /// Failures reaching the Clear AI server outside the pipeline
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for client errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

/// Convert AppError to a string for presentation-layer responses
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
