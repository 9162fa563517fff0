use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{middleware::AuthUser, reservation::ReservationError, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/bookings", post(create_booking))
}

// POST /api/bookings
#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    showtime_id: i32,
    seats: Vec<String>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    if req.showtime_id <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "showtime_id must be > 0" })),
        ));
    }

    // The engine decides commit vs. abort; this handler only translates.
    match state
        .engine
        .reserve(req.showtime_id, user.user_id, &req.seats)
        .await
    {
        Ok(booking) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Booking confirmed!",
                "bookingId": booking.booking_id,
                "totalAmount": booking.total_amount,
                "seats": booking.seats,
            })),
        )),
        Err(err) => Err(error_response(err)),
    }
}

fn error_response(err: ReservationError) -> (StatusCode, Json<Value>) {
    match err {
        ReservationError::InvalidRequest(reason) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": format!("Invalid booking request: {reason}.") })),
        ),
        ReservationError::ShowtimeNotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Showtime not found." })),
        ),
        ReservationError::SeatConflict { occupied } => (
            StatusCode::CONFLICT,
            Json(json!({
                "message": format!(
                    "Seats {} are already taken. Please pick different seats.",
                    occupied.join(", ")
                ),
                "occupiedSeats": occupied,
            })),
        ),
        ReservationError::CapacityExhausted {
            requested,
            available,
            ..
        } => (
            StatusCode::CONFLICT,
            Json(json!({
                "message": format!(
                    "Not enough seats left for this showtime ({available} available, {requested} requested)."
                ),
            })),
        ),
        ReservationError::StoreUnavailable(cause) => {
            tracing::error!("booking store failure: {:?}", cause);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Server error while booking. Please try again." })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_errors_map_to_the_documented_statuses() {
        let (status, _) = error_response(ReservationError::InvalidRequest("x".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(ReservationError::ShowtimeNotFound(5));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = error_response(ReservationError::SeatConflict {
            occupied: vec!["A1".to_string()],
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = error_response(ReservationError::CapacityExhausted {
            showtime_id: 5,
            requested: 2,
            available: 0,
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) =
            error_response(ReservationError::StoreUnavailable(sqlx::Error::PoolClosed));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_bodies_name_the_occupied_seats() {
        let (_, Json(body)) = error_response(ReservationError::SeatConflict {
            occupied: vec!["H8".to_string(), "H9".to_string()],
        });
        assert_eq!(body["occupiedSeats"], json!(["H8", "H9"]));
        assert!(body["message"].as_str().unwrap().contains("H8, H9"));
    }
}
