//! The seat ledger: durable `(showtime, seat)` claims in `booked_seats`.
//!
//! Only two operations exist, and both run inside the coordinator's
//! transaction. There is deliberately no unlocked occupancy read here: an
//! unlocked read-then-write is exactly the race this engine must prevent.

use sqlx::{Postgres, Transaction};

/// Row-lock every requested seat that is already claimed for the showtime
/// and return those labels. Overlapping reservation attempts serialize on
/// these locks instead of both observing "free".
pub async fn lock_and_check(
    tx: &mut Transaction<'_, Postgres>,
    showtime_id: i32,
    seat_ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT seat_id FROM booked_seats
         WHERE showtime_id = $1 AND seat_id = ANY($2)
         ORDER BY seat_id
         FOR UPDATE",
    )
    .bind(showtime_id)
    .bind(seat_ids)
    .fetch_all(&mut **tx)
    .await
}

/// Claim every seat for the given booking. Inserts run in sorted label order
/// so two overlapping multi-seat attempts cannot deadlock on each other.
///
/// A unique violation here means another transaction claimed one of the
/// seats after our `lock_and_check` observed it free; the caller turns that
/// into a seat conflict after rolling back.
pub async fn claim(
    tx: &mut Transaction<'_, Postgres>,
    showtime_id: i32,
    seat_ids: &[String],
    booking_id: i32,
) -> Result<(), sqlx::Error> {
    let mut ordered: Vec<&String> = seat_ids.iter().collect();
    ordered.sort();

    for seat_id in ordered {
        sqlx::query(
            "INSERT INTO booked_seats (booking_id, showtime_id, seat_id)
             VALUES ($1, $2, $3)",
        )
        .bind(booking_id)
        .bind(showtime_id)
        .bind(seat_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
