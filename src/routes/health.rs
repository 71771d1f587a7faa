use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
    pub store: StoreHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub backend: String,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub incidents: usize,
    pub loading: bool,
    pub subscribed: bool,
}

/// Health check endpoint - public
///
/// A failing backing service only degrades the service: the store keeps
/// serving its last-known-good list.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.backend.health_check().await;
    if let Err(e) = &backend {
        tracing::warn!(error = %e, "Backing service health check failed");
    }

    let (status, backend_status) = if backend.is_ok() {
        ("healthy", "ok")
    } else {
        ("degraded", "error")
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                backend: backend_status.to_string(),
            },
            store: StoreHealth {
                incidents: state.store.len(),
                loading: state.store.is_loading(),
                subscribed: state.store.is_subscribed(),
            },
        }),
    )
}
