//! Pluggable position sources.
//!
//! Platform code implements [`PositionSource`] to feed fixes into a session.
//! A subscription lives exactly as long as the returned stream: the session
//! drops the stream on cancellation, and the source releases the underlying
//! OS subscription when that happens (see [`release_on_drop`]).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;

use crate::tracking::{error::SubscriptionError, fix::LocationUpdate};

pub type FixStream = Pin<Box<dyn Stream<Item = Result<LocationUpdate, SubscriptionError>> + Send>>;

/// Update cadence requested from the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixRequest {
    pub interval: Duration,
    pub min_interval: Duration,
}

/// Subscribe to location updates.
pub trait PositionSource: Send + Sync {
    fn subscribe<'a>(
        &'a self,
        request: FixRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FixStream, SubscriptionError>> + Send + 'a>>;
}

/// Wrap `stream` so that `on_release` runs when the stream is dropped.
pub fn release_on_drop<F>(stream: FixStream, on_release: F) -> FixStream
where
    F: FnOnce() + Send + 'static,
{
    Box::pin(ReleaseOnDrop {
        inner: stream,
        on_release: Some(Box::new(on_release)),
    })
}

struct ReleaseOnDrop {
    inner: FixStream,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl Stream for ReleaseOnDrop {
    type Item = Result<LocationUpdate, SubscriptionError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}
