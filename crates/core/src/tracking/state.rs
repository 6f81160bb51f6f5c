use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::tracking::mode::ModeState;

/// Mutable state of one tracking session.
///
/// Owned by [`SessionDriver`](crate::tracking::driver::SessionDriver) and
/// mutated only by it.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    /// Always a valid index into the route.
    pub current_stop: usize,
    pub mode: ModeState,
    /// When the last fix was accepted (the session start if none has been).
    pub last_fix_at: Instant,
    /// Recording time of the last accepted fix, for ordering and display.
    pub last_fix_recorded_at: Option<DateTime<Utc>>,
    pub last_emitted_stop: Option<usize>,
}

impl SessionState {
    pub fn new(start_stop: usize, now: Instant) -> Self {
        Self {
            current_stop: start_stop,
            mode: ModeState::initial(now),
            last_fix_at: now,
            last_fix_recorded_at: None,
            last_emitted_stop: None,
        }
    }
}
