//! Error types for `mtkey` core library.

use thiserror::Error;

/// Result type alias using `mtkey` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `mtkey` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error: unreadable or malformed file, or an invalid value.
    #[error("Configuration error: {0}")]
    Config(String),
}
