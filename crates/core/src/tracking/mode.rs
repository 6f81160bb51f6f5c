//! Two-state tracking mode controller.
//!
//! ```text
//!            last fix older than staleness threshold
//!   LiveFix ─────────────────────────────────────────▶ Estimated
//!      ▲                                                  │
//!      └────────────────── accepted fix ──────────────────┘
//! ```
//!
//! Transitions are pure functions of the current state and an event; the
//! session driver owns the state and applies them.

use std::time::Duration;

use strum::{Display, IntoStaticStr};
use tokio::time::Instant;

/// Which signal currently decides the traveler's stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum TrackingMode {
    /// Recent fixes are trusted; the matched stop is current.
    LiveFix,
    /// Fixes are stale; the stop advances on the schedule.
    Estimated,
}

/// Mode plus the time reference each mode needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeState {
    LiveFix { entered_at: Instant },
    /// `since` is when the estimation clock was last reset: on entering the
    /// mode and again on every stop advance.
    Estimated { since: Instant },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeEvent {
    /// A fix passed the acceptance policy at `at`.
    FixAccepted { at: Instant },
    /// Periodic staleness check.
    Tick { now: Instant, last_fix_at: Instant },
}

impl ModeState {
    pub fn initial(now: Instant) -> Self {
        Self::LiveFix { entered_at: now }
    }

    pub fn mode(&self) -> TrackingMode {
        match self {
            Self::LiveFix { .. } => TrackingMode::LiveFix,
            Self::Estimated { .. } => TrackingMode::Estimated,
        }
    }

    /// Apply one event.
    ///
    /// A fix always lands in `LiveFix`; a tick moves `LiveFix` to `Estimated`
    /// once `now - last_fix_at` reaches `staleness_threshold`. Everything else
    /// leaves the state untouched.
    pub fn transition(self, event: ModeEvent, staleness_threshold: Duration) -> Self {
        match (self, event) {
            (Self::LiveFix { .. }, ModeEvent::FixAccepted { .. }) => self,
            (Self::Estimated { .. }, ModeEvent::FixAccepted { at }) => Self::LiveFix { entered_at: at },
            (Self::LiveFix { .. }, ModeEvent::Tick { now, last_fix_at }) => {
                if now.saturating_duration_since(last_fix_at) >= staleness_threshold {
                    Self::Estimated { since: now }
                } else {
                    self
                }
            }
            (Self::Estimated { .. }, ModeEvent::Tick { .. }) => self,
        }
    }
}
