use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::{middleware::AuthUser, models::User, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", get(get_profile).put(update_profile))
        .route("/users/me/bookings", get(get_booking_history))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_profile sql error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
        })?;

    match profile {
        Some(profile) => Ok(Json(profile)),
        None => Err((StatusCode::NOT_FOUND, "User not found.".to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    name: String,
    phone: Option<String>,
    birthday: Option<String>,
    address: Option<String>,
    gender: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let birthday = req
        .birthday
        .filter(|s| !s.is_empty())
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| (StatusCode::BAD_REQUEST, "birthday must be YYYY-MM-DD".to_string()))?;

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users
         SET username = $1, phone = $2, birthday = $3, address = $4, gender = COALESCE($5, gender)
         WHERE user_id = $6
         RETURNING *",
    )
    .bind(&req.name)
    .bind(req.phone.filter(|s| !s.is_empty()))
    .bind(birthday)
    .bind(req.address.filter(|s| !s.is_empty()))
    .bind(req.gender.filter(|s| !s.is_empty()))
    .bind(user.user_id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("update_profile sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    match updated {
        Some(profile) => Ok(Json(json!({
            "message": "Profile updated successfully!",
            "user": profile
        }))),
        None => Err((StatusCode::NOT_FOUND, "User not found.".to_string())),
    }
}

/* ---------- BOOKING HISTORY ---------- */

// Receipt view for the booking-history listing. Read-only: nothing in this
// module may touch the seat ledger.
#[derive(Debug, sqlx::FromRow, Serialize)]
struct BookingHistoryRow {
    booking_id: i32,
    movie_title: String,
    poster_url: Option<String>,
    genre: Option<String>,
    cinema_name: String,
    start_time: DateTime<Utc>,
    total_amount: i64,
    seats: Vec<String>,
}

async fn get_booking_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rows = sqlx::query_as::<_, BookingHistoryRow>(
        "SELECT b.booking_id, m.title AS movie_title, m.poster_url, m.genre,
                c.name AS cinema_name, s.start_time, b.total_amount, b.seats
         FROM bookings b
         JOIN showtimes s ON b.showtime_id = s.showtime_id
         JOIN movies m ON s.movie_id = m.movie_id
         JOIN cinemas c ON s.cinema_id = c.cinema_id
         WHERE b.user_id = $1
         ORDER BY s.start_time DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("get_booking_history sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    Ok(Json(rows))
}
