use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Immutable receipt of one successful reservation. The seat list is
// redundant with the booked_seats ledger rows and kept for fast retrieval.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: i32,
    pub user_id: i32,
    pub showtime_id: i32,
    pub total_amount: i64,
    pub seats: Vec<String>,
    pub created_at: DateTime<Utc>,
}
