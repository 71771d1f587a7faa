//! Coordinator chat routes

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::{DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{ChatSuggestion, SendChatRequest};
use crate::error::ApiResult;

/// Recent incidents offered as prompts
const SUGGESTION_COUNT: usize = 5;

/// GET /chat
pub async fn get_transcript(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    DataResponse::new(state.store.chat_history())
}

/// POST /chat
///
/// Appends the user message and the coordinator's reply; responds with the
/// reply.
pub async fn send_message(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendChatRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::debug!(user = %auth.label, "Chat message received");

    let reply = state.store.send_chat(&req.message).await?;
    Ok(DataResponse::new(reply))
}

/// DELETE /chat
pub async fn clear_transcript(State(state): State<Arc<AppState>>) -> NoContent {
    state.store.clear_chat();
    NoContent
}

/// GET /chat/suggestions
pub async fn get_suggestions(State(state): State<Arc<AppState>>) -> Json<DataResponse<Vec<ChatSuggestion>>> {
    let suggestions = state
        .store
        .incidents()
        .into_iter()
        .take(SUGGESTION_COUNT)
        .map(|incident| ChatSuggestion {
            prompt: format!("Tell me about incident {}", incident.id),
            incident_id: incident.id,
            title: incident.title,
        })
        .collect();

    Json(DataResponse::new(suggestions))
}
