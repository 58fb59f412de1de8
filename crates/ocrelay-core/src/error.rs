//! Error types for `ocrelay` core library.

use thiserror::Error;

/// Result type alias using `ocrelay` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `ocrelay` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
