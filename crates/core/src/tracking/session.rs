//! Running a tracking session on the tokio runtime.
//!
//! [`start_tracking`] spawns two tasks:
//!
//! - the **driver task** owns the [`SessionDriver`] and is the only place
//!   session state changes. It serializes inbox messages and ticker ticks
//!   through one `select!` loop, so a fix and a tick never interleave.
//! - the **fix listener** subscribes to the [`PositionSource`] and forwards
//!   updates into the driver's inbox. It owns the fix stream; dropping it
//!   releases the platform subscription.
//!
//! Both stop when the session's [`CancellationToken`] is cancelled.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nimetro_transit::RouteContext;

use crate::tracking::{
    config::TrackerConfig,
    driver::SessionDriver,
    error::{SubscriptionError, TrackingError},
    events::{StationListener, TrackingStatus},
    fix::LocationUpdate,
    source::{FixRequest, PositionSource},
};

enum DriverInput {
    Update(LocationUpdate),
    SourceError(SubscriptionError),
}

/// Start tracking `route` from `start_stop`.
///
/// Validation happens before anything is spawned: an invalid start index or
/// config returns an error and no session exists. Must be called from within
/// a tokio runtime.
pub fn start_tracking(
    route: RouteContext,
    start_stop: usize,
    config: TrackerConfig,
    source: Option<Arc<dyn PositionSource>>,
    listener: Option<Arc<dyn StationListener>>,
) -> Result<TrackingHandle, TrackingError> {
    let (driver, status) = SessionDriver::new(route, start_stop, config.clone(), listener, Instant::now())?;

    let cancel = CancellationToken::new();
    let (inbox_tx, inbox_rx) = mpsc::channel(config.input_buffer);

    let driver_task = tokio::spawn(run_driver(driver, inbox_rx, config.tick_interval, cancel.clone()));

    let listener_task = source.map(|source| {
        let request = FixRequest {
            interval: config.fix_interval,
            min_interval: config.fix_min_interval,
        };
        tokio::spawn(run_fix_listener(
            source,
            request,
            config.subscribe_timeout,
            inbox_tx.clone(),
            cancel.clone(),
        ))
    });

    Ok(TrackingHandle {
        cancel,
        inbox: inbox_tx,
        status,
        driver_task: Some(driver_task),
        listener_task,
    })
}

/// Owner of a running session.
///
/// Dropping the handle cancels the session.
pub struct TrackingHandle {
    cancel: CancellationToken,
    inbox: mpsc::Sender<DriverInput>,
    status: watch::Receiver<TrackingStatus>,
    driver_task: Option<JoinHandle<()>>,
    listener_task: Option<JoinHandle<()>>,
}

impl TrackingHandle {
    /// Most recently committed status. Never waits on pending fixes.
    pub fn current_status(&self) -> TrackingStatus {
        self.status.borrow().clone()
    }

    /// Receiver that is notified whenever the status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<TrackingStatus> {
        self.status.clone()
    }

    /// Feed an update directly, for shells that push fixes themselves.
    pub async fn push(&self, update: LocationUpdate) -> Result<(), TrackingError> {
        if self.cancel.is_cancelled() {
            return Err(TrackingError::SessionClosed);
        }
        self.inbox
            .send(DriverInput::Update(update))
            .await
            .map_err(|_| TrackingError::SessionClosed)
    }

    /// Non-waiting variant of [`push`](Self::push). A full inbox is
    /// [`TrackingError::InboxFull`]; the session keeps running.
    pub fn try_push(&self, update: LocationUpdate) -> Result<(), TrackingError> {
        if self.cancel.is_cancelled() {
            return Err(TrackingError::SessionClosed);
        }
        self.inbox
            .try_send(DriverInput::Update(update))
            .map_err(|error| match error {
                mpsc::error::TrySendError::Full(_) => TrackingError::InboxFull,
                mpsc::error::TrySendError::Closed(_) => TrackingError::SessionClosed,
            })
    }

    /// Stop both loops and release the position subscription. Idempotent.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!("cancelling tracking session");
            self.cancel.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait until both tasks have finished.
    pub async fn shutdown(mut self) {
        self.cancel();

        if let Some(task) = self.listener_task.take() {
            if let Err(error) = task.await {
                warn!(%error, "fix listener task failed");
            }
        }
        if let Some(task) = self.driver_task.take() {
            if let Err(error) = task.await {
                warn!(%error, "driver task failed");
            }
        }
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_driver(
    mut driver: SessionDriver,
    mut inbox: mpsc::Receiver<DriverInput>,
    tick_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut inbox_open = true;

    driver.begin();

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            input = inbox.recv(), if inbox_open => {
                let Some(input) = input else {
                    inbox_open = false;
                    continue;
                };
                if cancel.is_cancelled() {
                    break;
                }

                match input {
                    DriverInput::Update(update) => {
                        driver.on_update(update, Instant::now());
                    }
                    DriverInput::SourceError(error) => driver.on_source_error(&error),
                }
            }

            _ = ticker.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                driver.on_tick(Instant::now());
            }
        }
    }

    info!(stop = driver.state().current_stop, "tracking session stopped");
}

async fn run_fix_listener(
    source: Arc<dyn PositionSource>,
    request: FixRequest,
    subscribe_timeout: Duration,
    inbox: mpsc::Sender<DriverInput>,
    cancel: CancellationToken,
) {
    let subscription = tokio::time::timeout(subscribe_timeout, source.subscribe(request));

    let result = tokio::select! {
        biased;

        _ = cancel.cancelled() => return,

        result = subscription => result.unwrap_or(Err(SubscriptionError::Timeout(subscribe_timeout))),
    };

    let mut fixes = match result {
        Ok(fixes) => fixes,
        Err(error) => {
            let _ = inbox.send(DriverInput::SourceError(error)).await;
            return;
        }
    };

    debug!(?request, "subscribed to position source");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            item = fixes.next() => {
                let input = match item {
                    Some(Ok(update)) => DriverInput::Update(update),
                    Some(Err(error)) => DriverInput::SourceError(error),
                    None => {
                        debug!("position source ended");
                        break;
                    }
                };
                if inbox.send(input).await.is_err() {
                    break;
                }
            }
        }
    }

    // dropping the stream releases the subscription
    drop(fixes);
    debug!("released position source subscription");
}
