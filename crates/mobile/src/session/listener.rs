use std::sync::Arc;

use nimetro_core::tracking::{StationChange, StationListener, SubscriptionError};

use crate::session::records::StationChangeRecord;

/// Implemented by the app to update the foreground notification and send
/// arrival alerts.
#[uniffi::export(with_foreign)]
pub trait StationChangeListener: Send + Sync {
    fn on_station_changed(&self, change: StationChangeRecord);

    /// The location provider failed; tracking continues on the schedule.
    fn on_location_error(&self, message: String);
}

pub(crate) struct ListenerBridge(pub(crate) Arc<dyn StationChangeListener>);

impl StationListener for ListenerBridge {
    fn on_station_changed(&self, change: &StationChange) {
        self.0.on_station_changed(change.into());
    }

    fn on_source_error(&self, error: &SubscriptionError) {
        self.0.on_location_error(error.to_string());
    }
}
