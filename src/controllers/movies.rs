use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{models::Movie, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/{id}", get(get_movie))
        .route("/movies/{id}/showtimes", get(get_movie_showtimes))
}

#[derive(Debug, Deserialize)]
struct MoviesQuery {
    status: Option<String>,
}

async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MoviesQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let query = match params.status.as_deref() {
        Some("now-showing") => {
            "SELECT * FROM movies WHERE release_date <= CURRENT_DATE ORDER BY release_date DESC"
        }
        Some("coming-soon") => {
            "SELECT * FROM movies WHERE release_date > CURRENT_DATE ORDER BY release_date ASC"
        }
        _ => "SELECT * FROM movies ORDER BY release_date DESC",
    };

    let movies = sqlx::query_as::<_, Movie>(query)
        .fetch_all(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("list_movies sql error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
        })?;

    Ok(Json(movies))
}

async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let movie = sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE movie_id = $1")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_movie sql error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
        })?;

    match movie {
        Some(movie) => Ok(Json(movie)),
        None => Err((StatusCode::NOT_FOUND, "Movie not found.".to_string())),
    }
}

#[derive(Debug, sqlx::FromRow, Serialize)]
struct MovieShowtime {
    showtime_id: i32,
    start_time: DateTime<Utc>,
    ticket_price: i64,
    available_seats: i32,
    cinema_name: String,
    city: String,
}

async fn get_movie_showtimes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let showtimes = sqlx::query_as::<_, MovieShowtime>(
        "SELECT s.showtime_id, s.start_time, s.ticket_price, s.available_seats,
                c.name AS cinema_name, c.city
         FROM showtimes s
         JOIN cinemas c ON s.cinema_id = c.cinema_id
         WHERE s.movie_id = $1 AND s.start_time > NOW()
         ORDER BY c.city, c.name, s.start_time",
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("get_movie_showtimes sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    Ok(Json(showtimes))
}
