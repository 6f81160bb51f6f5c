use std::time::Duration;

use serde::Deserialize;

use crate::tracking::error::TrackingError;

/// Tuning for a tracking session.
///
/// The defaults match the behaviour of the metro app: fall back to schedule
/// estimation after 30 seconds without a fix, announce arrivals 30 seconds
/// early, and re-evaluate once per second.
///
/// Deserializes from seconds-valued fields so the app shell can ship a JSON
/// settings document; missing fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum age of the last accepted fix before switching to estimation.
    #[serde(rename = "staleness_threshold_secs", deserialize_with = "seconds::deserialize")]
    pub staleness_threshold: Duration,

    /// Subtracted from each edge travel time before declaring arrival.
    #[serde(rename = "arrival_lead_secs", deserialize_with = "seconds::deserialize")]
    pub arrival_lead: Duration,

    /// Cadence of the staleness check and estimation clock.
    #[serde(rename = "tick_interval_secs", deserialize_with = "seconds::deserialize")]
    pub tick_interval: Duration,

    /// Update interval requested from the position source.
    #[serde(rename = "fix_interval_secs", deserialize_with = "seconds::deserialize")]
    pub fix_interval: Duration,

    /// Fastest update interval the position source may deliver.
    #[serde(rename = "fix_min_interval_secs", deserialize_with = "seconds::deserialize")]
    pub fix_min_interval: Duration,

    /// How long to wait for the position source subscription.
    #[serde(rename = "subscribe_timeout_secs", deserialize_with = "seconds::deserialize")]
    pub subscribe_timeout: Duration,

    /// Fixes reporting a worse accuracy radius (meters) are treated as no fix.
    pub max_fix_accuracy_m: Option<f64>,

    /// Capacity of the driver's inbox.
    pub input_buffer: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            staleness_threshold: Duration::from_secs(30),
            arrival_lead: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
            fix_interval: Duration::from_secs(10),
            fix_min_interval: Duration::from_secs(5),
            subscribe_timeout: Duration::from_secs(10),
            max_fix_accuracy_m: None,
            input_buffer: 32,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), TrackingError> {
        if self.tick_interval.is_zero() {
            return Err(TrackingError::InvalidConfig("tick interval must be positive".into()));
        }
        if self.input_buffer == 0 {
            return Err(TrackingError::InvalidConfig("input buffer must hold at least one update".into()));
        }
        if let Some(limit) = self.max_fix_accuracy_m {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(TrackingError::InvalidConfig(format!(
                    "max fix accuracy must be a positive distance, got {limit}"
                )));
            }
        }
        Ok(())
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, de::Error};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(D::Error::custom(format!("expected a non-negative number of seconds, got {secs}")));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
