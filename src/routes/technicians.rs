use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::error::ApiResult;

/// GET /technicians
pub async fn list_technicians(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let technicians = state.backend.list_technicians().await?;
    Ok(DataResponse::new(technicians))
}
