//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use zipseed_registry::RegistryError;
use zipseed_storage::StorageError;

/// API error type, mirroring the failure taxonomy of the archive pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("repository has no files: {0}")]
    EmptyRepository(String),

    #[error("no file in {0} could be fetched")]
    EmptyArchive(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("archive error: {0}")]
    Archive(#[from] zipseed_core::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidRepo(msg) => Self::BadRequest(msg),
            other => Self::RegistryUnavailable(other.to_string()),
        }
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::RegistryUnavailable(_) => "registry_unavailable",
            Self::EmptyRepository(_) => "empty_repository",
            Self::EmptyArchive(_) => "empty_archive",
            Self::Storage(_) => "storage_error",
            Self::Archive(_) => "archive_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RegistryUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::EmptyRepository(_) => StatusCode::NOT_FOUND,
            Self::EmptyArchive(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = format!("{}: {}\n", self.code(), self);
        (status, body).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
