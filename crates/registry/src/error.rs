//! Registry error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Registry operation errors.
///
/// Listing failures are fatal for a request; a fetch failure concerns a
/// single file and the caller may skip it.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid repository id: {0}")]
    InvalidRepo(String),

    #[error("tree listing failed with status {status}")]
    List { status: StatusCode },

    #[error("tree listing returned an unparseable body: {0}")]
    ListDecode(#[source] reqwest::Error),

    #[error("fetch of {path:?} failed with status {status}")]
    Fetch { path: String, status: StatusCode },

    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid registry URL: {0}")]
    Url(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
