//! Station tracking along a planned route.
//!
//! Live fixes are matched to the nearest stop while they keep arriving; when
//! they go stale the session falls back to estimating progress from the
//! scheduled travel times, and returns to live matching on the next fix.
//!
//! # Components
//!
//! - [`matcher`] - nearest-stop matching
//! - [`mode`] - `LiveFix` / `Estimated` state machine
//! - [`clock`] - schedule-driven stop advancement
//! - [`driver`] - `SessionDriver`, the single writer of session state
//! - [`session`] - tokio tasks, cancellation and the `TrackingHandle`
//! - [`source`] - `PositionSource` trait for platform location providers

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod fix;
pub mod matcher;
pub mod mode;
pub mod session;
pub mod source;
pub mod state;

pub use clock::EstimationClock;
pub use config::TrackerConfig;
pub use driver::SessionDriver;
pub use error::{SubscriptionError, TrackingError};
pub use events::{StationChange, StationListener, TrackingStatus};
pub use fix::{Fix, FixRejection, LocationUpdate};
pub use matcher::{StopMatch, match_fix, nearest_stop};
pub use mode::{ModeEvent, ModeState, TrackingMode};
pub use session::{TrackingHandle, start_tracking};
pub use source::{FixRequest, FixStream, PositionSource, release_on_drop};
pub use state::SessionState;
