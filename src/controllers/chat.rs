use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{middleware::AuthUser, services::assistant::HistoryEntry, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    history: Option<Vec<HistoryEntry>>,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Message must not be empty.".to_string(),
        ));
    }

    let history = req.history.unwrap_or_default();

    match state.assistant.respond(&user, &req.message, &history).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => {
            tracing::error!("assistant pipeline failed: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error while handling the chat request.".to_string(),
            ))
        }
    }
}
