use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{middleware::AuthUser, models::Event, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/bookings", post(create_event_booking))
}

async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE event_date > NOW() ORDER BY event_date ASC",
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("list_events sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    Ok(Json(events))
}

// POST /api/events/bookings
//
// Event tickets carry no per-unit identity, so unlike seat reservations the
// whole claim is one guarded counter decrement plus a receipt row, committed
// together. The total is computed here from the stored price, never taken
// from the client.
#[derive(Debug, Deserialize)]
struct CreateEventBookingRequest {
    event_id: i32,
    number_of_tickets: i32,
}

async fn create_event_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateEventBookingRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.event_id <= 0 || req.number_of_tickets <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Invalid event booking request.".to_string(),
        ));
    }

    let mut tx = state.db.pool.begin().await.map_err(|e| {
        tracing::error!("event booking tx begin failed: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    // 1) Current price; 404 when the event does not exist
    let price: Option<i64> =
        sqlx::query_scalar("SELECT ticket_price FROM events WHERE event_id = $1")
            .bind(req.event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("event price lookup failed: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
            })?;

    let Some(price) = price else {
        tx.rollback().await.ok();
        return Err((StatusCode::NOT_FOUND, "Event not found.".to_string()));
    };

    // 2) Guarded quantity decrement; loses to concurrent claims cleanly
    let claimed = sqlx::query(
        "UPDATE events
         SET available_tickets = available_tickets - $1
         WHERE event_id = $2 AND available_tickets >= $1",
    )
    .bind(req.number_of_tickets)
    .bind(req.event_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("event ticket decrement failed: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    if claimed.rows_affected() == 0 {
        tx.rollback().await.ok();
        return Err((
            StatusCode::CONFLICT,
            "Not enough tickets left for this event.".to_string(),
        ));
    }

    // 3) Receipt row with the server-computed total
    let total_amount = price * req.number_of_tickets as i64;
    let booking_id: i32 = sqlx::query_scalar(
        "INSERT INTO event_bookings (user_id, event_id, number_of_tickets, total_amount)
         VALUES ($1, $2, $3, $4)
         RETURNING event_booking_id",
    )
    .bind(user.user_id)
    .bind(req.event_id)
    .bind(req.number_of_tickets)
    .bind(total_amount)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("event booking insert failed: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("event booking commit failed: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Event tickets booked successfully!",
            "bookingId": booking_id,
            "totalAmount": total_amount,
        })),
    ))
}
