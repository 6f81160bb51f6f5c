//! Tracking session exported to the Android foreground service.
//!
//! The service creates one [`TrackingSession`] per trip. The session owns a
//! tokio runtime that drives the core tracker; the platform pushes location
//! callbacks in through [`TrackingSession::submit_fix`] and receives station
//! changes on its [`StationChangeListener`].

pub mod listener;
pub mod provider;
pub mod records;

use std::sync::{Arc, Mutex};

use chrono::DateTime;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use nimetro_core::tracking::{
    Fix, LocationUpdate, PositionSource, StationListener, TrackerConfig, TrackingError, TrackingHandle,
    start_tracking,
};

pub use listener::StationChangeListener;
pub use provider::LocationProvider;
pub use records::{RouteInput, StationChangeRecord, StatusRecord, StopInput, TrackerSettings, TrackingModeKind};

use crate::logging::setup_logging;
use listener::ListenerBridge;
use provider::PlatformSource;

#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum MobileTrackingError {
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid fix: {0}")]
    InvalidFix(String),

    #[error("failed to start runtime: {0}")]
    Runtime(String),

    #[error("location update buffer is full")]
    InboxFull,

    #[error("tracking session is closed")]
    SessionClosed,
}

impl From<TrackingError> for MobileTrackingError {
    fn from(error: TrackingError) -> Self {
        match error {
            TrackingError::InvalidRoute(error) => Self::InvalidRoute(error.to_string()),
            TrackingError::InvalidConfig(message) => Self::InvalidSettings(message),
            TrackingError::InboxFull => Self::InboxFull,
            TrackingError::SessionClosed => Self::SessionClosed,
        }
    }
}

#[uniffi::export]
pub fn default_tracker_settings() -> TrackerSettings {
    TrackerSettings::from(&TrackerConfig::default())
}

/// Parse settings from the app's remote config JSON. Missing keys take
/// their defaults.
#[uniffi::export]
pub fn settings_from_json(json: String) -> Result<TrackerSettings, MobileTrackingError> {
    let config: TrackerConfig =
        serde_json::from_str(&json).map_err(|error| MobileTrackingError::InvalidSettings(error.to_string()))?;
    config
        .validate()
        .map_err(|error| MobileTrackingError::InvalidSettings(error.to_string()))?;
    Ok(TrackerSettings::from(&config))
}

#[derive(uniffi::Object)]
pub struct TrackingSession {
    handle: Mutex<Option<TrackingHandle>>,
    last_status: Mutex<Option<StatusRecord>>,
    // Only taken in `Drop`.
    runtime: Option<Runtime>,
}

#[uniffi::export]
impl TrackingSession {
    #[uniffi::constructor]
    pub fn start(
        route: RouteInput,
        start_index: u32,
        settings: TrackerSettings,
        provider: Arc<dyn LocationProvider>,
        listener: Arc<dyn StationChangeListener>,
    ) -> Result<Self, MobileTrackingError> {
        setup_logging();

        let route = route.into_context()?;
        let config = TrackerConfig::try_from(settings)?;

        let runtime = Runtime::new().map_err(|error| MobileTrackingError::Runtime(error.to_string()))?;

        let source: Arc<dyn PositionSource> = Arc::new(PlatformSource::new(provider));
        let listener: Arc<dyn StationListener> = Arc::new(ListenerBridge(listener));

        let route_id = route.id().clone();
        let handle = {
            let _guard = runtime.enter();
            start_tracking(route, start_index as usize, config, Some(source), Some(listener))?
        };
        info!(route = %route_id, start_index, "tracking session started");

        Ok(Self {
            handle: Mutex::new(Some(handle)),
            last_status: Mutex::new(None),
            runtime: Some(runtime),
        })
    }

    /// Forward a platform location callback.
    pub fn submit_fix(
        &self,
        latitude: f64,
        longitude: f64,
        accuracy_m: Option<f64>,
        recorded_at_ms: i64,
    ) -> Result<(), MobileTrackingError> {
        let recorded_at = DateTime::from_timestamp_millis(recorded_at_ms)
            .ok_or_else(|| MobileTrackingError::InvalidFix(format!("timestamp out of range: {recorded_at_ms}")))?;

        let mut fix = Fix::new(latitude, longitude, recorded_at);
        if let Some(accuracy) = accuracy_m {
            fix = fix.with_accuracy(accuracy);
        }
        self.send(LocationUpdate::Fix(fix))
    }

    /// The platform reported that no location is currently available.
    pub fn report_unavailable(&self) -> Result<(), MobileTrackingError> {
        self.send(LocationUpdate::Unavailable)
    }

    pub fn current_status(&self) -> Result<StatusRecord, MobileTrackingError> {
        if let Some(handle) = self.lock_handle().as_ref() {
            return Ok(handle.current_status().into());
        }
        self.last_status
            .lock()
            .ok()
            .and_then(|status| status.clone())
            .ok_or(MobileTrackingError::SessionClosed)
    }

    pub fn is_active(&self) -> bool {
        self.lock_handle().as_ref().is_some_and(|handle| !handle.is_cancelled())
    }

    /// End the session and release the location subscription. Idempotent,
    /// and safe to call from a listener callback.
    pub fn cancel(&self) {
        let Some(handle) = self.lock_handle().take() else {
            return;
        };

        let status = StatusRecord::from(handle.current_status());
        if let Ok(mut last_status) = self.last_status.lock() {
            *last_status = Some(status);
        }

        // Stops both loops right away; shutdown only waits for them to finish.
        handle.cancel();
        match (&self.runtime, tokio::runtime::Handle::try_current()) {
            (Some(runtime), Err(_)) => runtime.block_on(handle.shutdown()),
            (Some(runtime), Ok(_)) => {
                // Blocking here would deadlock or panic on a runtime thread.
                runtime.spawn(handle.shutdown());
            }
            (None, _) => drop(handle),
        }
        info!("tracking session cancelled");
    }
}

impl TrackingSession {
    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<TrackingHandle>> {
        self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send(&self, update: LocationUpdate) -> Result<(), MobileTrackingError> {
        let handle = self.lock_handle();
        let handle = handle.as_ref().ok_or(MobileTrackingError::SessionClosed)?;

        match handle.try_push(update) {
            Ok(()) => Ok(()),
            Err(TrackingError::InboxFull) => {
                warn!("location update buffer full, dropping update");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.cancel();

        // The last reference can be released from a listener callback, where
        // dropping the runtime would block inside it.
        if tokio::runtime::Handle::try_current().is_ok() {
            if let Some(runtime) = self.runtime.take() {
                runtime.shutdown_background();
            }
        }
    }
}
