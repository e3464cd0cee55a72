//! Health check endpoint.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;

/// GET /v1/health - verify the service and its storage backend are up.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<&'static str> {
    state.storage.health_check().await?;
    Ok("ok\n")
}
