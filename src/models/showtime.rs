use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// `available_seats` is derived from the seat ledger but persisted for O(1)
// reads; it is only ever updated in the same transaction as the ledger.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Showtime {
    pub showtime_id: i32,
    pub movie_id: i32,
    pub cinema_id: i32,
    pub start_time: DateTime<Utc>,
    pub ticket_price: i64,
    pub total_seats: i32,
    pub available_seats: i32,
}
