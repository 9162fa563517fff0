use thiserror::Error;

/// Everything `ReservationEngine::reserve` can fail with.
///
/// The split matters to callers: `InvalidRequest` and `ShowtimeNotFound` are
/// caller errors, `SeatConflict` / `CapacityExhausted` are resource conflicts
/// to be resolved by picking different seats, and `StoreUnavailable` is the
/// only variant worth retrying, always by re-running the whole call.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("invalid reservation request: {0}")]
    InvalidRequest(String),

    #[error("showtime {0} not found")]
    ShowtimeNotFound(i32),

    #[error("seats already taken: {}", .occupied.join(", "))]
    SeatConflict { occupied: Vec<String> },

    #[error("showtime {showtime_id} cannot seat {requested} more ({available} left)")]
    CapacityExhausted {
        showtime_id: i32,
        requested: usize,
        available: i32,
    },

    #[error("booking store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl ReservationError {
    /// Safe to retry only when the store itself failed; a retry must re-run
    /// the full reservation protocol, never resume a partial one.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::StoreUnavailable(_))
    }
}
