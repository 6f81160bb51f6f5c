//! Bridge from the platform location API to a core position source.
//!
//! The app implements [`LocationProvider`] around the OS location client and
//! forwards every callback into [`TrackingSession::submit_fix`], which pushes
//! straight into the session inbox. The source here only owns the OS
//! subscription: it starts updates when the session subscribes and stops them
//! when the session drops the stream. A refused subscription therefore leaves
//! the session able to take fixes the app delivers later.
//!
//! [`TrackingSession::submit_fix`]: crate::session::TrackingSession::submit_fix

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use tracing::info;

use nimetro_core::tracking::{FixRequest, FixStream, LocationUpdate, PositionSource, SubscriptionError, release_on_drop};

#[uniffi::export(with_foreign)]
pub trait LocationProvider: Send + Sync {
    /// Begin OS location updates. Returns false if they cannot be started
    /// (permission denied, location disabled).
    fn start_updates(&self, interval_ms: u64, min_interval_ms: u64) -> bool;

    /// Release the OS subscription.
    fn stop_updates(&self);
}

pub(crate) struct PlatformSource {
    provider: Arc<dyn LocationProvider>,
}

impl PlatformSource {
    pub(crate) fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self { provider }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

impl PositionSource for PlatformSource {
    fn subscribe<'a>(
        &'a self,
        request: FixRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FixStream, SubscriptionError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.provider.start_updates(millis(request.interval), millis(request.min_interval)) {
                return Err(SubscriptionError::Unavailable);
            }
            info!(interval = ?request.interval, "requested platform location updates");

            // Fixes arrive through the session inbox; the stream just holds the subscription open.
            let subscription: FixStream =
                Box::pin(stream::pending::<Result<LocationUpdate, SubscriptionError>>());

            let provider = Arc::clone(&self.provider);
            Ok(release_on_drop(subscription, move || {
                info!("stopping platform location updates");
                provider.stop_updates();
            }))
        })
    }
}
