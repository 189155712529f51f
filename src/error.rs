//! Crate-level error type.

use std::io;

use thiserror::Error;

/// Errors raised while loading configuration or decoding board input.
///
/// Stage confirmation failures are not part of this type: they are recovered
/// inside the board controller and reported as notices.
#[derive(Error, Debug)]
pub enum BoardError {
    /// Configuration sources could not be read or deserialized.
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but holds an unusable value.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading input files.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP client could not be constructed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;
