use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtimes-by-cinema", get(showtimes_by_cinema))
        .route("/showtimes/{id}/occupied-seats", get(occupied_seats))
}

/* ---------- DAILY PROGRAM ---------- */

#[derive(Debug, Deserialize)]
struct ProgramQuery {
    #[serde(rename = "cinemaId")]
    cinema_id: Option<i32>,
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShowtimeSlot {
    showtime_id: i32,
    start_time: DateTime<Utc>,
    ticket_price: i64,
}

#[derive(Debug, Serialize)]
struct MovieProgram {
    movie_id: i32,
    title: String,
    genre: Option<String>,
    duration_minutes: Option<i32>,
    rating: Option<f64>,
    age_rating: Option<String>,
    poster_url: Option<String>,
    features: Option<Vec<String>>,
    times: Vec<ShowtimeSlot>,
}

// One cinema's full program for one day, grouped by movie.
async fn showtimes_by_cinema(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProgramQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let Some(cinema_id) = params.cinema_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide cinemaId and date.".to_string(),
        ));
    };
    let date = params
        .date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or((
            StatusCode::BAD_REQUEST,
            "Please provide cinemaId and date.".to_string(),
        ))?;

    let rows = sqlx::query(
        "SELECT m.movie_id, m.title, m.genre, m.duration_minutes, m.rating, m.age_rating,
                m.poster_url, m.features, s.showtime_id, s.start_time, s.ticket_price
         FROM movies m
         JOIN showtimes s ON m.movie_id = s.movie_id
         WHERE s.cinema_id = $1
           AND s.start_time >= $2
           AND s.start_time < $2 + interval '1 day'
           AND s.start_time > NOW()
         ORDER BY m.title, s.start_time",
    )
    .bind(cinema_id)
    .bind(date)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("showtimes_by_cinema sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    // Group flat rows into one entry per movie
    let mut map: BTreeMap<i32, MovieProgram> = BTreeMap::new();
    for r in rows {
        let movie_id: i32 = r.get("movie_id");
        let entry = map.entry(movie_id).or_insert_with(|| MovieProgram {
            movie_id,
            title: r.get("title"),
            genre: r.get("genre"),
            duration_minutes: r.get("duration_minutes"),
            rating: r.get("rating"),
            age_rating: r.get("age_rating"),
            poster_url: r.get("poster_url"),
            features: r.get("features"),
            times: Vec::new(),
        });
        entry.times.push(ShowtimeSlot {
            showtime_id: r.get("showtime_id"),
            start_time: r.get("start_time"),
            ticket_price: r.get("ticket_price"),
        });
    }

    let program: Vec<MovieProgram> = map.into_values().collect();
    Ok(Json(program))
}

/* ---------- OCCUPIED SEATS ---------- */

// Advisory seat-map read: committed ledger rows only. The reservation
// transaction re-checks under lock, so this endpoint may lag without harm.
async fn occupied_seats(
    State(state): State<Arc<AppState>>,
    Path(showtime_id): Path<i32>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let seats: Vec<String> = sqlx::query_scalar(
        "SELECT seat_id FROM booked_seats WHERE showtime_id = $1 ORDER BY seat_id",
    )
    .bind(showtime_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("occupied_seats sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    Ok(Json(seats))
}
