//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("archive field overflow: {0}")]
    ArchiveTooLarge(String),

    #[error("torrent invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
