use std::time::Duration;

use chrono::{DateTime, Utc};
use nimetro_transit::StopIdentifier;

use crate::tracking::{error::SubscriptionError, mode::TrackingMode};

/// Emitted once per genuine change of the current stop.
#[derive(Clone, Debug, PartialEq)]
pub struct StationChange {
    pub stop_index: usize,
    pub stop_id: StopIdentifier,
    pub stop_name: String,
    pub mode: TrackingMode,
}

/// Snapshot of the committed session state for display.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingStatus {
    pub stop_index: usize,
    pub stop_id: StopIdentifier,
    pub stop_name: String,
    pub mode: TrackingMode,
    /// Recording time of the last accepted fix.
    pub last_fix_at: Option<DateTime<Utc>>,
    pub at_final_stop: bool,
    /// Scheduled time from the current stop to the end of the route.
    pub remaining_travel_time: Duration,
}

/// Receiver of session events. At most one is registered per session;
/// fanning out to notifications or broadcasts is up to the implementation.
///
/// Called from the session's driver task, so implementations should return
/// quickly.
pub trait StationListener: Send + Sync {
    fn on_station_changed(&self, change: &StationChange);

    /// The position source failed. The session keeps running.
    fn on_source_error(&self, _error: &SubscriptionError) {}
}
