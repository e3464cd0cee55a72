//! Archive request endpoint.

use crate::error::{ApiError, ApiResult};
use crate::pipeline;
use crate::state::AppState;
use axum::extract::{Query, State};
use serde::Deserialize;
use zipseed_registry::RepoId;

/// Query parameters for the archive endpoint.
#[derive(Debug, Deserialize)]
pub struct ArchiveParams {
    repo: Option<String>,
}

/// GET /?repo=owner/name - archive a repository revision into the object
/// store and emit its torrent. Returns a plain-text status body.
pub async fn archive_repo(
    State(state): State<AppState>,
    Query(params): Query<ArchiveParams>,
) -> ApiResult<String> {
    let repo_param = params
        .repo
        .ok_or_else(|| ApiError::BadRequest("missing repo query parameter".to_string()))?;
    let repo = RepoId::parse(&repo_param)?;

    let outcome = pipeline::run(&state, &repo).await?;

    Ok(format!(
        "archived {repo}: {} files ({} skipped), {} bytes, {} pieces\n",
        outcome.files, outcome.skipped, outcome.archive_len, outcome.piece_count
    ))
}
