//! The seat reservation transaction engine.
//!
//! One reservation attempt is one atomic unit of work against Postgres:
//!
//! 1. row-lock the requested seats that already exist in the ledger
//!    (`FOR UPDATE`), so overlapping attempts serialize instead of racing;
//! 2. abort with the exact occupied labels if any were found;
//! 3. look up the showtime's current price and availability;
//! 4. write the booking receipt, one ledger row per seat, and the guarded
//!    counter decrement;
//! 5. commit, or roll every write back on any failure.
//!
//! Two attempts that both observed a seat as free still cannot double-sell
//! it: the unique key on `(showtime_id, seat_id)` makes the second insert
//! fail, and that failure is reported as a seat conflict like any other.

pub mod counter;
pub mod error;
pub mod ledger;

pub use error::ReservationError;

use crate::models::Booking;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;

#[derive(Clone)]
pub struct ReservationEngine {
    pool: PgPool,
}

impl ReservationEngine {
    /// The pool is owned by the hosting service; the engine only borrows
    /// connections for the duration of one attempt.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Atomically claim `seat_ids` for `showtime_id` on behalf of `user_id`.
    ///
    /// Returns the committed booking receipt, or an error with the store
    /// exactly as it was before the call: no partial claims, no counter
    /// drift, ever.
    pub async fn reserve(
        &self,
        showtime_id: i32,
        user_id: i32,
        seat_ids: &[String],
    ) -> Result<Booking, ReservationError> {
        validate_request(seat_ids)?;

        let mut tx = self.pool.begin().await?;

        match self.run_protocol(&mut tx, showtime_id, user_id, seat_ids).await {
            Ok(booking) => {
                tx.commit().await?;
                Ok(booking)
            }
            Err(err) => {
                // All-or-nothing: drop every pending write and release the locks.
                tx.rollback().await.ok();

                if let ReservationError::StoreUnavailable(ref cause) = err {
                    if is_unique_violation(cause) {
                        // Lost the insert race: another attempt committed one of
                        // these seats first. Report it as an ordinary conflict.
                        let occupied = self.committed_claims(showtime_id, seat_ids).await?;
                        return Err(ReservationError::SeatConflict { occupied });
                    }
                }
                Err(err)
            }
        }
    }

    async fn run_protocol(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        showtime_id: i32,
        user_id: i32,
        seat_ids: &[String],
    ) -> Result<Booking, ReservationError> {
        // 1) Lock the requested seats that are already claimed.
        let occupied = ledger::lock_and_check(tx, showtime_id, seat_ids).await?;
        if !occupied.is_empty() {
            return Err(ReservationError::SeatConflict { occupied });
        }

        // 2) Current price and availability for this showtime.
        let row: Option<(i64, i32)> = sqlx::query_as(
            "SELECT ticket_price, available_seats FROM showtimes WHERE showtime_id = $1",
        )
        .bind(showtime_id)
        .fetch_optional(&mut **tx)
        .await?;

        let (ticket_price, available) = match row {
            Some(r) => r,
            None => return Err(ReservationError::ShowtimeNotFound(showtime_id)),
        };

        let requested = seat_ids.len();
        if available < requested as i32 {
            return Err(ReservationError::CapacityExhausted {
                showtime_id,
                requested,
                available,
            });
        }

        // 3) Uniform per-seat pricing.
        let total_amount = ticket_price * requested as i64;

        // 4) The receipt row, in the request's seat order.
        let booking: Booking = sqlx::query_as(
            "INSERT INTO bookings (user_id, showtime_id, total_amount, seats)
             VALUES ($1, $2, $3, $4)
             RETURNING booking_id, user_id, showtime_id, total_amount, seats, created_at",
        )
        .bind(user_id)
        .bind(showtime_id)
        .bind(total_amount)
        .bind(seat_ids)
        .fetch_one(&mut **tx)
        .await?;

        // 5) One ledger row per seat.
        ledger::claim(tx, showtime_id, seat_ids, booking.booking_id).await?;

        // 6) Counter moves with the ledger or not at all.
        if !counter::decrement(tx, showtime_id, requested as i32).await? {
            let available: i32 =
                sqlx::query_scalar("SELECT available_seats FROM showtimes WHERE showtime_id = $1")
                    .bind(showtime_id)
                    .fetch_one(&mut **tx)
                    .await?;
            return Err(ReservationError::CapacityExhausted {
                showtime_id,
                requested,
                available,
            });
        }

        Ok(booking)
    }

    // Committed claims overlapping the request, read after our rollback.
    async fn committed_claims(
        &self,
        showtime_id: i32,
        seat_ids: &[String],
    ) -> Result<Vec<String>, ReservationError> {
        let mut occupied = sqlx::query_scalar::<_, String>(
            "SELECT seat_id FROM booked_seats
             WHERE showtime_id = $1 AND seat_id = ANY($2)
             ORDER BY seat_id",
        )
        .bind(showtime_id)
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await?;

        if occupied.is_empty() {
            // The winning transaction must have covered at least one of the
            // requested seats; fall back to the whole request.
            occupied = seat_ids.to_vec();
        }
        Ok(occupied)
    }
}

fn validate_request(seat_ids: &[String]) -> Result<(), ReservationError> {
    if seat_ids.is_empty() {
        return Err(ReservationError::InvalidRequest(
            "seat list is empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for seat in seat_ids {
        if seat.trim().is_empty() {
            return Err(ReservationError::InvalidRequest(
                "blank seat label".to_string(),
            ));
        }
        if !seen.insert(seat.as_str()) && !duplicates.contains(&seat.as_str()) {
            duplicates.push(seat.as_str());
        }
    }

    if !duplicates.is_empty() {
        return Err(ReservationError::InvalidRequest(format!(
            "duplicate seat labels: {}",
            duplicates.join(", ")
        )));
    }

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_request_is_invalid() {
        let err = validate_request(&[]).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidRequest(_)));
    }

    #[test]
    fn duplicate_labels_are_invalid_and_named() {
        let err = validate_request(&seats(&["A1", "A2", "A1"])).unwrap_err();
        match err {
            ReservationError::InvalidRequest(msg) => assert!(msg.contains("A1")),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn blank_labels_are_invalid() {
        let err = validate_request(&seats(&["A1", "  "])).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidRequest(_)));
    }

    #[test]
    fn distinct_labels_pass() {
        assert!(validate_request(&seats(&["A1", "A2", "B7"])).is_ok());
    }

    #[test]
    fn only_store_errors_are_retryable() {
        assert!(ReservationError::StoreUnavailable(sqlx::Error::PoolClosed).is_retryable());
        assert!(!ReservationError::SeatConflict {
            occupied: vec!["A1".to_string()]
        }
        .is_retryable());
        assert!(!ReservationError::ShowtimeNotFound(1).is_retryable());
    }
}
