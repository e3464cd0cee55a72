//! HTTP service for zipseed.
//!
//! This crate provides the request surface and the archive pipeline:
//! - The `GET /?repo=<owner>/<name>` endpoint driving the pipeline
//! - The single-pass streaming pipeline (registry -> ZIP framing ->
//!   multipart sink, with torrent piece hashing teed off the same bytes)
//! - Error mapping to HTTP statuses

pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use pipeline::{ArchiveOutcome, TORRENT_CONTENT_TYPE, ZIP_CONTENT_TYPE};
pub use routes::create_router;
pub use state::AppState;
