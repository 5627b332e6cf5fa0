//! Error types for exercise-sync
//!
//! Storage, configuration and CLI failures are converted to `AppError`.
//! Catalog requests have their own `FetchError`, which the synchronizer
//! consumes locally and never propagates past the sync loop.

use reqwest::StatusCode;
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested exercise does not exist in the store
    #[error("Exercise not found: {0}")]
    NotFound(String),

    /// Record or argument failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations failed to apply
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Document (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Failure of a single catalog page request
///
/// Every variant is treated as transient by the sync loop.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or timeout failure
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { status: StatusCode, url: String },

    /// Body was not the expected JSON envelope
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(e) if e.is_timeout() => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode(_) => "decode",
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
