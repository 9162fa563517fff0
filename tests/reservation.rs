//! Integration tests for the seat reservation engine, run against a real
//! Postgres instance (DATABASE_URL) with the crate's own migrations.

use cinema_booking::reservation::{ReservationEngine, ReservationError};
use sqlx::PgPool;

struct Fixture {
    showtime_id: i32,
    user_id: i32,
    other_user_id: i32,
    capacity: i32,
}

async fn seed(pool: &PgPool, price: i64, capacity: i32) -> Fixture {
    let movie_id: i32 = sqlx::query_scalar(
        "INSERT INTO movies (title, genre, release_date)
         VALUES ('Wicked', 'Fantasy', CURRENT_DATE)
         RETURNING movie_id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let cinema_id: i32 = sqlx::query_scalar(
        "INSERT INTO cinemas (name, city) VALUES ('Grand Central', 'Da Nang') RETURNING cinema_id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash)
         VALUES ('moviegoer', 'moviegoer@example.com', 'not-a-real-hash')
         RETURNING user_id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let other_user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash)
         VALUES ('rival', 'rival@example.com', 'not-a-real-hash')
         RETURNING user_id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let showtime_id: i32 = sqlx::query_scalar(
        "INSERT INTO showtimes (movie_id, cinema_id, start_time, ticket_price, total_seats, available_seats)
         VALUES ($1, $2, NOW() + interval '1 day', $3, $4, $4)
         RETURNING showtime_id",
    )
    .bind(movie_id)
    .bind(cinema_id)
    .bind(price)
    .bind(capacity)
    .fetch_one(pool)
    .await
    .unwrap();

    Fixture {
        showtime_id,
        user_id,
        other_user_id,
        capacity,
    }
}

fn seats(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

async fn available(pool: &PgPool, showtime_id: i32) -> i32 {
    sqlx::query_scalar("SELECT available_seats FROM showtimes WHERE showtime_id = $1")
        .bind(showtime_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn claimed(pool: &PgPool, showtime_id: i32) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM booked_seats WHERE showtime_id = $1")
        .bind(showtime_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn booking_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
        .fetch_one(pool)
        .await
        .unwrap()
}

/* ---------- caller errors ---------- */

#[sqlx::test(migrations = "src/migrations")]
async fn empty_seat_list_is_rejected(pool: PgPool) {
    let fx = seed(&pool, 80_000, 50).await;
    let engine = ReservationEngine::new(pool.clone());

    let err = engine
        .reserve(fx.showtime_id, fx.user_id, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::InvalidRequest(_)));
    assert_eq!(booking_count(&pool).await, 0);
}

#[sqlx::test(migrations = "src/migrations")]
async fn duplicate_seats_are_a_caller_error_not_a_conflict(pool: PgPool) {
    let fx = seed(&pool, 80_000, 50).await;
    let engine = ReservationEngine::new(pool.clone());

    let err = engine
        .reserve(fx.showtime_id, fx.user_id, &seats(&["H8", "H8"]))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::InvalidRequest(_)));
    assert_eq!(claimed(&pool, fx.showtime_id).await, 0);
}

#[sqlx::test(migrations = "src/migrations")]
async fn unknown_showtime_is_reported(pool: PgPool) {
    let fx = seed(&pool, 80_000, 50).await;
    let engine = ReservationEngine::new(pool.clone());

    let missing = fx.showtime_id + 1000;
    let err = engine
        .reserve(missing, fx.user_id, &seats(&["A1"]))
        .await
        .unwrap_err();

    match err {
        ReservationError::ShowtimeNotFound(id) => assert_eq!(id, missing),
        other => panic!("expected ShowtimeNotFound, got {other:?}"),
    }
}

/* ---------- the happy path ---------- */

#[sqlx::test(migrations = "src/migrations")]
async fn booking_commits_receipt_ledger_and_counter_together(pool: PgPool) {
    let fx = seed(&pool, 80_000, 50).await;
    let engine = ReservationEngine::new(pool.clone());

    let booking = engine
        .reserve(fx.showtime_id, fx.user_id, &seats(&["A1", "A2"]))
        .await
        .unwrap();

    // Uniform pricing: 80000 x 2
    assert_eq!(booking.total_amount, 160_000);
    assert_eq!(booking.seats, seats(&["A1", "A2"]));
    assert_eq!(booking.user_id, fx.user_id);

    // Ledger rows reference the receipt
    let rows: Vec<(String, i32)> = sqlx::query_as(
        "SELECT seat_id, booking_id FROM booked_seats WHERE showtime_id = $1 ORDER BY seat_id",
    )
    .bind(fx.showtime_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(
        rows,
        vec![
            ("A1".to_string(), booking.booking_id),
            ("A2".to_string(), booking.booking_id)
        ]
    );

    // Counter stays in lockstep with the ledger
    assert_eq!(available(&pool, fx.showtime_id).await, fx.capacity - 2);
}

/* ---------- conflicts and atomicity ---------- */

#[sqlx::test(migrations = "src/migrations")]
async fn conflict_names_exact_seats_and_changes_nothing(pool: PgPool) {
    let fx = seed(&pool, 80_000, 50).await;
    let engine = ReservationEngine::new(pool.clone());

    engine
        .reserve(fx.showtime_id, fx.user_id, &seats(&["A1", "A2"]))
        .await
        .unwrap();

    let before_available = available(&pool, fx.showtime_id).await;
    let before_claimed = claimed(&pool, fx.showtime_id).await;
    let before_bookings = booking_count(&pool).await;

    // A2 is taken, A3 is free: the whole request must fail, naming only A2
    let err = engine
        .reserve(fx.showtime_id, fx.other_user_id, &seats(&["A2", "A3"]))
        .await
        .unwrap_err();
    match err {
        ReservationError::SeatConflict { occupied } => assert_eq!(occupied, seats(&["A2"])),
        other => panic!("expected SeatConflict, got {other:?}"),
    }

    // Byte-for-byte unchanged
    assert_eq!(available(&pool, fx.showtime_id).await, before_available);
    assert_eq!(claimed(&pool, fx.showtime_id).await, before_claimed);
    assert_eq!(booking_count(&pool).await, before_bookings);

    // Conflict reporting is idempotent
    let err = engine
        .reserve(fx.showtime_id, fx.other_user_id, &seats(&["A2", "A3"]))
        .await
        .unwrap_err();
    match err {
        ReservationError::SeatConflict { occupied } => assert_eq!(occupied, seats(&["A2"])),
        other => panic!("expected SeatConflict, got {other:?}"),
    }
}

/* ---------- concurrency ---------- */

#[sqlx::test(migrations = "src/migrations")]
async fn concurrent_same_seat_has_exactly_one_winner(pool: PgPool) {
    let fx = seed(&pool, 80_000, 50).await;
    let engine_a = ReservationEngine::new(pool.clone());
    let engine_b = engine_a.clone();

    let seats_a = seats(&["A1"]);
    let seats_b = seats(&["A1"]);
    let (res_a, res_b) = tokio::join!(
        engine_a.reserve(fx.showtime_id, fx.user_id, &seats_a),
        engine_b.reserve(fx.showtime_id, fx.other_user_id, &seats_b),
    );

    let results = [res_a, res_b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let loser = results
        .into_iter()
        .find(|r| r.is_err())
        .unwrap()
        .unwrap_err();
    match loser {
        ReservationError::SeatConflict { occupied } => assert_eq!(occupied, seats(&["A1"])),
        other => panic!("expected SeatConflict, got {other:?}"),
    }

    // One claim, one decrement
    assert_eq!(claimed(&pool, fx.showtime_id).await, 1);
    assert_eq!(available(&pool, fx.showtime_id).await, fx.capacity - 1);
}

#[sqlx::test(migrations = "src/migrations")]
async fn concurrent_disjoint_seats_both_commit(pool: PgPool) {
    let fx = seed(&pool, 80_000, 50).await;
    let engine_a = ReservationEngine::new(pool.clone());
    let engine_b = engine_a.clone();

    let seats_a = seats(&["A1"]);
    let seats_b = seats(&["A2"]);
    let (res_a, res_b) = tokio::join!(
        engine_a.reserve(fx.showtime_id, fx.user_id, &seats_a),
        engine_b.reserve(fx.showtime_id, fx.other_user_id, &seats_b),
    );

    assert!(res_a.is_ok(), "A1 booking failed: {res_a:?}");
    assert!(res_b.is_ok(), "A2 booking failed: {res_b:?}");
    assert_eq!(available(&pool, fx.showtime_id).await, fx.capacity - 2);
    assert_eq!(claimed(&pool, fx.showtime_id).await, 2);
}

/* ---------- capacity ---------- */

#[sqlx::test(migrations = "src/migrations")]
async fn exhausted_showtime_rejects_every_further_request(pool: PgPool) {
    let fx = seed(&pool, 80_000, 2).await;
    let engine = ReservationEngine::new(pool.clone());

    engine
        .reserve(fx.showtime_id, fx.user_id, &seats(&["A1", "A2"]))
        .await
        .unwrap();
    assert_eq!(available(&pool, fx.showtime_id).await, 0);

    // A fresh seat label cannot get past the availability check
    let err = engine
        .reserve(fx.showtime_id, fx.other_user_id, &seats(&["B1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::CapacityExhausted { available: 0, .. }));

    // A claimed seat label still reports the conflict itself
    let err = engine
        .reserve(fx.showtime_id, fx.other_user_id, &seats(&["A1"]))
        .await
        .unwrap_err();
    match err {
        ReservationError::SeatConflict { occupied } => assert_eq!(occupied, seats(&["A1"])),
        other => panic!("expected SeatConflict, got {other:?}"),
    }
}

#[sqlx::test(migrations = "src/migrations")]
async fn partial_capacity_rejection_leaves_no_trace(pool: PgPool) {
    let fx = seed(&pool, 80_000, 3).await;
    let engine = ReservationEngine::new(pool.clone());

    engine
        .reserve(fx.showtime_id, fx.user_id, &seats(&["A1", "A2"]))
        .await
        .unwrap();

    // Only one seat left; a two-seat request must fail whole
    let err = engine
        .reserve(fx.showtime_id, fx.other_user_id, &seats(&["B1", "B2"]))
        .await
        .unwrap_err();
    match err {
        ReservationError::CapacityExhausted {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("expected CapacityExhausted, got {other:?}"),
    }

    assert_eq!(booking_count(&pool).await, 1);
    assert_eq!(claimed(&pool, fx.showtime_id).await, 2);
    assert_eq!(available(&pool, fx.showtime_id).await, 1);
}
