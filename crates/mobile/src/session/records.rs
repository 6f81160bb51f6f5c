//! Plain records crossing the FFI boundary and their conversions.

use std::time::Duration;

use nimetro_core::tracking::{StationChange, TrackerConfig, TrackingMode, TrackingStatus};
use nimetro_core::transit::{RouteContext, Stop, TravelTime};

use crate::session::MobileTrackingError;

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct StopInput {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A planned route as produced by the route planner: stops in travel order
/// and the minutes between each consecutive pair.
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct RouteInput {
    pub id: String,
    pub stops: Vec<StopInput>,
    pub travel_times_minutes: Vec<f64>,
}

impl RouteInput {
    pub(crate) fn into_context(self) -> Result<RouteContext, MobileTrackingError> {
        let stops = self
            .stops
            .into_iter()
            .map(|stop| Stop::new(stop.id, stop.name, stop.latitude, stop.longitude))
            .collect();
        let travel_times = self
            .travel_times_minutes
            .into_iter()
            .map(TravelTime::from_minutes)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| MobileTrackingError::InvalidRoute(error.to_string()))?;

        RouteContext::new(self.id, stops, travel_times)
            .map_err(|error| MobileTrackingError::InvalidRoute(error.to_string()))
    }
}

/// Flat view of [`TrackerConfig`] with durations in seconds.
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct TrackerSettings {
    pub staleness_threshold_secs: f64,
    pub arrival_lead_secs: f64,
    pub tick_interval_secs: f64,
    pub fix_interval_secs: f64,
    pub fix_min_interval_secs: f64,
    pub subscribe_timeout_secs: f64,
    pub max_fix_accuracy_m: Option<f64>,
}

impl From<&TrackerConfig> for TrackerSettings {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            staleness_threshold_secs: config.staleness_threshold.as_secs_f64(),
            arrival_lead_secs: config.arrival_lead.as_secs_f64(),
            tick_interval_secs: config.tick_interval.as_secs_f64(),
            fix_interval_secs: config.fix_interval.as_secs_f64(),
            fix_min_interval_secs: config.fix_min_interval.as_secs_f64(),
            subscribe_timeout_secs: config.subscribe_timeout.as_secs_f64(),
            max_fix_accuracy_m: config.max_fix_accuracy_m,
        }
    }
}

impl TryFrom<TrackerSettings> for TrackerConfig {
    type Error = MobileTrackingError;

    fn try_from(settings: TrackerSettings) -> Result<Self, Self::Error> {
        let secs = |name: &str, value: f64| {
            Duration::try_from_secs_f64(value)
                .map_err(|_| MobileTrackingError::InvalidSettings(format!("{name} must be a non-negative number, got {value}")))
        };

        let config = TrackerConfig {
            staleness_threshold: secs("staleness_threshold_secs", settings.staleness_threshold_secs)?,
            arrival_lead: secs("arrival_lead_secs", settings.arrival_lead_secs)?,
            tick_interval: secs("tick_interval_secs", settings.tick_interval_secs)?,
            fix_interval: secs("fix_interval_secs", settings.fix_interval_secs)?,
            fix_min_interval: secs("fix_min_interval_secs", settings.fix_min_interval_secs)?,
            subscribe_timeout: secs("subscribe_timeout_secs", settings.subscribe_timeout_secs)?,
            max_fix_accuracy_m: settings.max_fix_accuracy_m,
            ..TrackerConfig::default()
        };

        config
            .validate()
            .map_err(|error| MobileTrackingError::InvalidSettings(error.to_string()))?;
        Ok(config)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum TrackingModeKind {
    LiveFix,
    Estimated,
}

impl From<TrackingMode> for TrackingModeKind {
    fn from(mode: TrackingMode) -> Self {
        match mode {
            TrackingMode::LiveFix => Self::LiveFix,
            TrackingMode::Estimated => Self::Estimated,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct StationChangeRecord {
    pub stop_index: u32,
    pub stop_id: String,
    pub stop_name: String,
    pub mode: TrackingModeKind,
}

impl From<&StationChange> for StationChangeRecord {
    fn from(change: &StationChange) -> Self {
        Self {
            stop_index: change.stop_index as u32,
            stop_id: change.stop_id.to_string(),
            stop_name: change.stop_name.clone(),
            mode: change.mode.into(),
        }
    }
}

/// What the foreground notification shows.
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct StatusRecord {
    pub stop_index: u32,
    pub stop_id: String,
    pub stop_name: String,
    pub mode: TrackingModeKind,
    /// Unix milliseconds of the last accepted fix.
    pub last_fix_at_ms: Option<i64>,
    pub at_final_stop: bool,
    pub remaining_travel_secs: u64,
}

impl From<TrackingStatus> for StatusRecord {
    fn from(status: TrackingStatus) -> Self {
        Self {
            stop_index: status.stop_index as u32,
            stop_id: status.stop_id.to_string(),
            stop_name: status.stop_name,
            mode: status.mode.into(),
            last_fix_at_ms: status.last_fix_at.map(|at| at.timestamp_millis()),
            at_final_stop: status.at_final_stop,
            remaining_travel_secs: status.remaining_travel_time.as_secs(),
        }
    }
}
