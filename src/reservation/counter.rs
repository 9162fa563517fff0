//! Denormalized available-seat counter on `showtimes`.
//!
//! The counter is a read optimization, never the conflict arbiter. It must
//! move in the same transaction as the ledger rows or the two drift apart
//! under failure.

use sqlx::{Postgres, Transaction};

/// Decrement the showtime's availability by `n`, guarded so the counter can
/// never go negative. Returns false when the showtime cannot seat `n` more.
pub async fn decrement(
    tx: &mut Transaction<'_, Postgres>,
    showtime_id: i32,
    n: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE showtimes
         SET available_seats = available_seats - $1
         WHERE showtime_id = $2 AND available_seats >= $1",
    )
    .bind(n)
    .bind(showtime_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}
