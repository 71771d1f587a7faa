//! Incident routes
//!
//! Listing and filtering read the store's cached list. Lookup by id goes
//! to the backing service so detail pages see the durable copy.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::{Created, DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{Incident, NewIncident};
use crate::error::{ApiError, ApiResult};
use crate::filter::{HistoryFilter, HistoryQuery};
use crate::middleware::RequestIdExt;

#[derive(Serialize)]
pub struct IncidentListResponse {
    #[serde(flatten)]
    pub page: Paginated<Incident>,
    /// A refresh is in flight; the data may be about to change
    pub loading: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub count: usize,
    pub loading: bool,
}

/// GET /incidents
///
/// Filtered incident history, most recent first.
pub async fn list_incidents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<IncidentListResponse>> {
    let filter = HistoryFilter::try_from(query)?;
    let matching = filter.apply(&state.store.incidents());

    tracing::debug!(
        search = %filter.search,
        matches = matching.len(),
        "Listing incidents"
    );

    Ok(Json(IncidentListResponse {
        page: Paginated::from_vec(matching, &pagination),
        loading: state.store.is_loading(),
    }))
}

/// GET /incidents/:incident_id
pub async fn get_incident(
    State(state): State<Arc<AppState>>,
    Path(incident_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let incident = state
        .backend
        .get_incident(&incident_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Incident {} not found", incident_id)))?;

    Ok(DataResponse::new(incident))
}

/// POST /incidents
///
/// Submit through the store so the new incident shows up in the cached list
/// right away.
pub async fn submit_incident(
    auth: RequireAuth,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewIncident>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(
        user = %auth.label,
        request_id = headers.request_id().unwrap_or("-"),
        category = %req.category,
        priority = %req.priority,
        "Submitting incident"
    );

    let incident = state.store.submit_incident(&req).await?;
    let location = format!("/incidents/{}", incident.id);

    Ok(Created::new(DataResponse::new(incident)).at(location))
}

/// POST /incidents/refresh
///
/// Reload from the backing service. A failed reload keeps the previous list.
pub async fn refresh_incidents(State(state): State<Arc<AppState>>) -> Json<DataResponse<RefreshResponse>> {
    state.store.refresh().await;

    Json(DataResponse::new(RefreshResponse {
        count: state.store.len(),
        loading: state.store.is_loading(),
    }))
}
