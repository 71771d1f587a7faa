pub mod chat;
pub mod dashboard;
pub mod health;
pub mod incidents;
pub mod technicians;

use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;
use crate::auth::require_auth;

/// Build the API router with all routes
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        // Incidents
        .route(
            "/incidents",
            get(incidents::list_incidents).post(incidents::submit_incident),
        )
        .route("/incidents/refresh", post(incidents::refresh_incidents))
        .route("/incidents/:incident_id", get(incidents::get_incident))
        // Directory and dashboard
        .route("/technicians", get(technicians::list_technicians))
        .route("/dashboard/stats", get(dashboard::get_stats))
        // Coordinator chat
        .route(
            "/chat",
            get(chat::get_transcript)
                .post(chat::send_message)
                .delete(chat::clear_transcript),
        )
        .route("/chat/suggestions", get(chat::get_suggestions))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .merge(protected)
}
