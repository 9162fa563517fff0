use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::{models::Promotion, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/promotions", get(list_promotions))
}

async fn list_promotions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let promotions = sqlx::query_as::<_, Promotion>(
        "SELECT * FROM promotions ORDER BY featured DESC, valid_until ASC",
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("list_promotions sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    Ok(Json(promotions))
}
