use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{models::Cinema, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cinemas", get(list_cinemas))
        .route("/cinemas/cities", get(list_cities))
}

#[derive(Debug, Deserialize)]
struct CinemasQuery {
    city: Option<String>,
}

async fn list_cinemas(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CinemasQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let city = params.city.filter(|c| c != "all");

    let cinemas = match city {
        Some(city) => {
            sqlx::query_as::<_, Cinema>("SELECT * FROM cinemas WHERE city = $1 ORDER BY name")
                .bind(city)
                .fetch_all(&state.db.pool)
                .await
        }
        None => {
            sqlx::query_as::<_, Cinema>("SELECT * FROM cinemas ORDER BY name")
                .fetch_all(&state.db.pool)
                .await
        }
    }
    .map_err(|e| {
        tracing::error!("list_cinemas sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    Ok(Json(cinemas))
}

async fn list_cities(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT city, COUNT(cinema_id) AS count FROM cinemas GROUP BY city ORDER BY city",
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("list_cities sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    let cities: Vec<_> = rows
        .into_iter()
        .map(|(city, count)| json!({ "city": city, "count": count }))
        .collect();

    Ok(Json(cities))
}
