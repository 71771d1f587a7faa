use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::error::ApiResult;

/// GET /dashboard/stats
///
/// Recomputed by the backing service on every call.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let stats = state.backend.dashboard_stats().await?;
    Ok(DataResponse::new(stats))
}
