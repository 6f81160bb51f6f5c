//! The single writer of session state.
//!
//! [`SessionDriver`] runs the fix → match → mode → clock pipeline and applies
//! the emission rule: a [`StationChange`] goes out if and only if the resolved
//! stop differs from the last one emitted. It is synchronous; the session task
//! in [`session`](crate::tracking::session) serializes every fix and tick
//! through one driver.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use nimetro_transit::RouteContext;

use crate::tracking::{
    clock::EstimationClock,
    config::TrackerConfig,
    error::{SubscriptionError, TrackingError},
    events::{StationChange, StationListener, TrackingStatus},
    fix::{Fix, LocationUpdate, check_fix},
    matcher::match_fix,
    mode::{ModeEvent, ModeState},
    state::SessionState,
};

pub struct SessionDriver {
    route: RouteContext,
    config: TrackerConfig,
    clock: EstimationClock,
    state: SessionState,
    listener: Option<Arc<dyn StationListener>>,
    status_tx: watch::Sender<TrackingStatus>,
}

impl SessionDriver {
    /// Create the driver and the status channel it publishes to.
    ///
    /// Fails if `start_stop` is not a stop of `route` or the config is invalid;
    /// no state exists in that case.
    pub fn new(
        route: RouteContext,
        start_stop: usize,
        config: TrackerConfig,
        listener: Option<Arc<dyn StationListener>>,
        now: Instant,
    ) -> Result<(Self, watch::Receiver<TrackingStatus>), TrackingError> {
        route.check_index(start_stop)?;
        config.validate()?;

        let state = SessionState::new(start_stop, now);
        let clock = EstimationClock::new(config.arrival_lead);
        let initial = status_of(&route, &state);
        let (status_tx, status_rx) = watch::channel(initial);

        let driver = Self {
            route,
            config,
            clock,
            state,
            listener,
            status_tx,
        };

        Ok((driver, status_rx))
    }

    pub fn route(&self) -> &RouteContext {
        &self.route
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> TrackingStatus {
        status_of(&self.route, &self.state)
    }

    /// Announce the starting stop.
    pub fn begin(&mut self) -> Option<StationChange> {
        info!(
            route = %self.route.id(),
            stops = self.route.len(),
            start = self.state.current_stop,
            "tracking session started"
        );
        self.commit()
    }

    pub fn on_update(&mut self, update: LocationUpdate, now: Instant) -> Option<StationChange> {
        match update {
            LocationUpdate::Fix(fix) => self.on_fix(fix, now),
            LocationUpdate::Unavailable => {
                // Staleness is measured from the last accepted fix, so nothing to do
                debug!("position source reported no fix");
                None
            }
        }
    }

    /// Feed one fix through matching and the mode controller.
    pub fn on_fix(&mut self, fix: Fix, now: Instant) -> Option<StationChange> {
        if let Err(reason) = check_fix(&fix, self.config.max_fix_accuracy_m, self.state.last_fix_recorded_at) {
            debug!(%reason, "ignoring fix");
            return None;
        }

        let matched = match_fix(&fix, &self.route);
        debug!(
            stop = matched.index,
            distance_m = matched.distance_m,
            "matched fix to stop"
        );

        self.apply_mode(ModeEvent::FixAccepted { at: now });
        // the matched stop wins over any estimation progress
        self.state.current_stop = matched.index;
        self.state.last_fix_at = now;
        self.state.last_fix_recorded_at = Some(fix.recorded_at);

        self.commit()
    }

    /// Staleness check, then one estimation step when estimating.
    pub fn on_tick(&mut self, now: Instant) -> Option<StationChange> {
        self.apply_mode(ModeEvent::Tick {
            now,
            last_fix_at: self.state.last_fix_at,
        });

        if let ModeState::Estimated { since } = self.state.mode {
            if let Some(next) = self.clock.tick(now, since, self.state.current_stop, &self.route) {
                debug!(from = self.state.current_stop, to = next, "estimated arrival");
                self.state.current_stop = next;
                self.state.mode = ModeState::Estimated { since: now };
            }
        }

        self.commit()
    }

    pub fn on_source_error(&self, error: &SubscriptionError) {
        warn!(%error, "position source failed, continuing without fixes");
        if let Some(listener) = &self.listener {
            listener.on_source_error(error);
        }
    }

    fn apply_mode(&mut self, event: ModeEvent) {
        let previous = self.state.mode;
        self.state.mode = previous.transition(event, self.config.staleness_threshold);

        if previous.mode() != self.state.mode.mode() {
            info!(
                from = %previous.mode(),
                to = %self.state.mode.mode(),
                stop = self.state.current_stop,
                "tracking mode changed"
            );
        }
    }

    /// Emit if the current stop differs from the last emitted one, and publish
    /// the status snapshot.
    fn commit(&mut self) -> Option<StationChange> {
        let current = self.state.current_stop;
        let status = self.status();

        if self.state.last_emitted_stop == Some(current) {
            self.status_tx.send_if_modified(|published| {
                if *published == status {
                    false
                } else {
                    *published = status;
                    true
                }
            });
            return None;
        }

        self.state.last_emitted_stop = Some(current);
        let change = StationChange {
            stop_index: current,
            stop_id: status.stop_id.clone(),
            stop_name: status.stop_name.clone(),
            mode: status.mode,
        };

        info!(
            stop = %change.stop_id,
            name = %change.stop_name,
            index = change.stop_index,
            mode = %change.mode,
            "station changed"
        );

        // Publish first so a listener reading the status sees the new stop.
        self.status_tx.send_replace(status);
        if let Some(listener) = &self.listener {
            listener.on_station_changed(&change);
        }

        Some(change)
    }
}

fn status_of(route: &RouteContext, state: &SessionState) -> TrackingStatus {
    // current_stop is kept in range by construction
    let stop = &route.stops()[state.current_stop];

    TrackingStatus {
        stop_index: state.current_stop,
        stop_id: stop.id.clone(),
        stop_name: stop.name.clone(),
        mode: state.mode.mode(),
        last_fix_at: state.last_fix_recorded_at,
        at_final_stop: route.is_last(state.current_stop),
        remaining_travel_time: route.remaining_travel_time(state.current_stop),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use nimetro_transit::{Stop, TransitError, TravelTime};

    use super::*;
    use crate::tracking::mode::TrackingMode;

    #[derive(Default)]
    struct RecordingListener {
        changes: Mutex<Vec<StationChange>>,
        errors: Mutex<Vec<SubscriptionError>>,
    }

    impl RecordingListener {
        fn stops(&self) -> Vec<usize> {
            self.changes.lock().unwrap().iter().map(|c| c.stop_index).collect()
        }
    }

    impl StationListener for RecordingListener {
        fn on_station_changed(&self, change: &StationChange) {
            self.changes.lock().unwrap().push(change.clone());
        }

        fn on_source_error(&self, error: &SubscriptionError) {
            self.errors.lock().unwrap().push(error.clone());
        }
    }

    // A(0,0) -3min-> B(0,1) -4min-> C(0,2)
    fn line() -> RouteContext {
        let stops = vec![
            Stop::new("a", "A", 0.0, 0.0),
            Stop::new("b", "B", 0.0, 1.0),
            Stop::new("c", "C", 0.0, 2.0),
        ];
        let times = vec![
            TravelTime::from_minutes(3.0).unwrap(),
            TravelTime::from_minutes(4.0).unwrap(),
        ];
        RouteContext::new("r", stops, times).unwrap()
    }

    fn wall(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn fix_at_stop(route: &RouteContext, index: usize, secs: i64) -> Fix {
        let stop = &route.stops()[index];
        Fix::new(stop.latitude(), stop.longitude(), wall(secs))
    }

    fn driver_with(config: TrackerConfig, t0: Instant) -> (SessionDriver, Arc<RecordingListener>) {
        let listener = Arc::new(RecordingListener::default());
        let (mut driver, _status) =
            SessionDriver::new(line(), 0, config, Some(listener.clone() as Arc<dyn StationListener>), t0).unwrap();
        driver.begin();
        (driver, listener)
    }

    fn driver(t0: Instant) -> (SessionDriver, Arc<RecordingListener>) {
        driver_with(TrackerConfig::default(), t0)
    }

    fn secs(t0: Instant, s: u64) -> Instant {
        t0 + Duration::from_secs(s)
    }

    #[test]
    fn test_start_index_out_of_range() {
        let result = SessionDriver::new(line(), 3, TrackerConfig::default(), None, Instant::now());
        assert!(matches!(
            result,
            Err(TrackingError::InvalidRoute(TransitError::IndexOutOfRange { index: 3, len: 3 }))
        ));
    }

    #[test]
    fn test_empty_route_is_invalid() {
        let error: TrackingError = RouteContext::new("r", vec![], vec![]).unwrap_err().into();
        assert!(matches!(error, TrackingError::InvalidRoute(TransitError::EmptyRoute)));
    }

    #[test]
    fn test_begin_announces_starting_stop_once() {
        let t0 = Instant::now();
        let (mut driver, listener) = driver(t0);

        assert_eq!(listener.stops(), vec![0]);
        assert!(driver.begin().is_none());
        assert_eq!(listener.stops(), vec![0]);
    }

    #[test]
    fn test_repeated_fixes_emit_once() {
        let t0 = Instant::now();
        let (mut driver, listener) = driver(t0);
        let route = line();

        let first = driver.on_fix(fix_at_stop(&route, 1, 10), secs(t0, 10));
        assert_eq!(first.map(|c| c.stop_index), Some(1));

        for i in 0..5 {
            let s = 20 + i * 10;
            assert!(driver.on_fix(fix_at_stop(&route, 1, s as i64), secs(t0, s)).is_none());
            assert!(driver.on_tick(secs(t0, s + 1)).is_none());
        }

        assert_eq!(listener.stops(), vec![0, 1]);
    }

    #[test]
    fn test_fix_jumps_directly_to_matched_stop() {
        let t0 = Instant::now();
        let (mut driver, listener) = driver(t0);
        let route = line();

        let change = driver.on_fix(fix_at_stop(&route, 2, 5), secs(t0, 5)).unwrap();
        assert_eq!(change.stop_index, 2);
        assert_eq!(change.stop_id.as_str(), "c");
        assert_eq!(change.mode, TrackingMode::LiveFix);

        // No event for B in between
        assert_eq!(listener.stops(), vec![0, 2]);
        assert_eq!(driver.state().current_stop, 2);
    }

    #[test]
    fn test_live_fix_may_move_backwards() {
        let t0 = Instant::now();
        let (mut driver, listener) = driver(t0);
        let route = line();

        driver.on_fix(fix_at_stop(&route, 2, 5), secs(t0, 5));
        driver.on_fix(fix_at_stop(&route, 0, 15), secs(t0, 15));

        assert_eq!(listener.stops(), vec![0, 2, 0]);
    }

    #[test]
    fn test_staleness_boundary() {
        let t0 = Instant::now();
        let (mut driver, _) = driver(t0);
        let route = line();

        driver.on_fix(fix_at_stop(&route, 0, 100), secs(t0, 100));

        driver.on_tick(secs(t0, 129));
        assert_eq!(driver.state().mode.mode(), TrackingMode::LiveFix);
        driver.on_tick(secs(t0, 130) - Duration::from_millis(1));
        assert_eq!(driver.state().mode.mode(), TrackingMode::LiveFix);

        driver.on_tick(secs(t0, 130));
        assert_eq!(driver.state().mode, ModeState::Estimated { since: secs(t0, 130) });
    }

    #[test]
    fn test_estimation_scenario() {
        let t0 = Instant::now();
        let config = TrackerConfig {
            staleness_threshold: Duration::ZERO,
            ..TrackerConfig::default()
        };
        let (mut driver, listener) = driver_with(config, t0);

        // Immediately stale
        assert!(driver.on_tick(t0).is_none());
        assert_eq!(driver.state().mode.mode(), TrackingMode::Estimated);

        let mut advanced_at = Vec::new();
        for s in 1..=900 {
            if let Some(change) = driver.on_tick(secs(t0, s)) {
                assert_eq!(change.mode, TrackingMode::Estimated);
                advanced_at.push((change.stop_index, s));
            }
        }

        // B at 3min - 30s, C at 150s + (4min - 30s)
        assert_eq!(advanced_at, vec![(1, 150), (2, 360)]);
        assert_eq!(listener.stops(), vec![0, 1, 2]);
        assert!(driver.status().at_final_stop);
    }

    #[test]
    fn test_estimation_never_moves_backwards() {
        let t0 = Instant::now();
        let (mut driver, _) = driver(t0);

        let mut previous = driver.state().current_stop;
        // Coarse, uneven ticks
        let mut s = 0;
        while s < 1200 {
            s += 7;
            driver.on_tick(secs(t0, s));
            let current = driver.state().current_stop;
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, 2);
    }

    #[test]
    fn test_estimation_starts_from_stop_at_fallback() {
        let t0 = Instant::now();
        let (mut driver, listener) = driver(t0);
        let route = line();

        driver.on_fix(fix_at_stop(&route, 1, 0), t0);
        // Stale at 30s, B -> C needs 210s after that
        driver.on_tick(secs(t0, 30));
        assert!(driver.on_tick(secs(t0, 239)).is_none());
        assert_eq!(driver.on_tick(secs(t0, 240)).map(|c| c.stop_index), Some(2));
        assert_eq!(listener.stops(), vec![0, 1, 2]);
    }

    #[test]
    fn test_fix_overrides_estimation() {
        let t0 = Instant::now();
        let (mut driver, listener) = driver(t0);
        let route = line();

        driver.on_tick(secs(t0, 30)); // stale
        driver.on_tick(secs(t0, 180)); // estimated arrival at B
        assert_eq!(driver.state().current_stop, 1);

        // A fresh fix says we're still at A
        let change = driver.on_fix(fix_at_stop(&route, 0, 181), secs(t0, 181)).unwrap();
        assert_eq!(change.stop_index, 0);
        assert_eq!(change.mode, TrackingMode::LiveFix);
        assert_eq!(driver.state().mode, ModeState::LiveFix { entered_at: secs(t0, 181) });
        assert_eq!(listener.stops(), vec![0, 1, 0]);

        // Estimation restarts from A only after the fix goes stale again
        driver.on_tick(secs(t0, 211));
        assert_eq!(driver.state().mode, ModeState::Estimated { since: secs(t0, 211) });
        assert!(driver.on_tick(secs(t0, 360)).is_none());
        assert_eq!(driver.on_tick(secs(t0, 361)).map(|c| c.stop_index), Some(1));
    }

    #[test]
    fn test_fix_matching_current_stop_is_silent_on_mode_change() {
        let t0 = Instant::now();
        let (mut driver, listener) = driver(t0);
        let route = line();

        driver.on_tick(secs(t0, 30));
        assert_eq!(driver.state().mode.mode(), TrackingMode::Estimated);

        assert!(driver.on_fix(fix_at_stop(&route, 0, 40), secs(t0, 40)).is_none());
        assert_eq!(driver.state().mode.mode(), TrackingMode::LiveFix);
        assert_eq!(listener.stops(), vec![0]);
        assert_eq!(driver.status().mode, TrackingMode::LiveFix);
    }

    #[test]
    fn test_terminal_estimation() {
        let t0 = Instant::now();
        let (mut driver, listener) = driver(t0);
        let route = line();

        driver.on_fix(fix_at_stop(&route, 2, 0), t0);
        for s in (30..3600).step_by(10) {
            assert!(driver.on_tick(secs(t0, s)).is_none());
        }
        assert_eq!(driver.state().current_stop, 2);
        assert_eq!(listener.stops(), vec![0, 2]);
    }

    #[test]
    fn test_rejected_fixes_do_not_refresh_staleness() {
        let t0 = Instant::now();
        let config = TrackerConfig {
            max_fix_accuracy_m: Some(50.0),
            ..TrackerConfig::default()
        };
        let (mut driver, listener) = driver_with(config, t0);
        let route = line();

        driver.on_fix(fix_at_stop(&route, 0, 100), t0);

        let invalid = Fix::new(f64::NAN, 0.0, wall(110));
        let inaccurate = fix_at_stop(&route, 2, 120).with_accuracy(500.0);
        let out_of_order = fix_at_stop(&route, 1, 90);
        assert!(driver.on_fix(invalid, secs(t0, 10)).is_none());
        assert!(driver.on_fix(inaccurate, secs(t0, 20)).is_none());
        assert!(driver.on_fix(out_of_order, secs(t0, 25)).is_none());
        assert!(driver.on_update(LocationUpdate::Unavailable, secs(t0, 28)).is_none());

        assert_eq!(driver.state().last_fix_at, t0);
        driver.on_tick(secs(t0, 30));
        assert_eq!(driver.state().mode.mode(), TrackingMode::Estimated);
        assert_eq!(listener.stops(), vec![0]);
    }

    #[test]
    fn test_status_tracks_committed_state() {
        let t0 = Instant::now();
        let listener = Arc::new(RecordingListener::default());
        let (mut driver, status) =
            SessionDriver::new(line(), 0, TrackerConfig::default(), Some(listener as Arc<dyn StationListener>), t0)
                .unwrap();
        driver.begin();
        let route = line();

        assert_eq!(status.borrow().stop_index, 0);
        assert_eq!(status.borrow().remaining_travel_time, Duration::from_secs(7 * 60));

        driver.on_fix(fix_at_stop(&route, 1, 3), secs(t0, 3));
        {
            let snapshot = status.borrow();
            assert_eq!(snapshot.stop_index, 1);
            assert_eq!(snapshot.stop_name, "B");
            assert_eq!(snapshot.last_fix_at, Some(wall(3)));
            assert!(!snapshot.at_final_stop);
        }

        driver.on_tick(secs(t0, 33));
        assert_eq!(status.borrow().mode, TrackingMode::Estimated);
        assert_eq!(*status.borrow(), driver.status());
    }

    #[test]
    fn test_source_error_reaches_listener() {
        let t0 = Instant::now();
        let (driver, listener) = driver(t0);

        driver.on_source_error(&SubscriptionError::Unavailable);
        assert_eq!(*listener.errors.lock().unwrap(), vec![SubscriptionError::Unavailable]);
    }
}
