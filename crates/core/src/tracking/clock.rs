//! Schedule-driven stop estimation.
//!
//! While fixes are stale the traveler is assumed to keep moving along the
//! route at the scheduled pace. The clock is plain arithmetic over instants;
//! it never sleeps, so the driver stays responsive to fixes while estimating.

use std::time::Duration;

use nimetro_transit::RouteContext;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct EstimationClock {
    /// Arrival is announced this long before the scheduled travel time elapses.
    lead: Duration,
}

impl EstimationClock {
    pub fn new(lead: Duration) -> Self {
        Self { lead }
    }

    /// Elapsed time after which the traveler is considered to have reached the
    /// stop after `current`. `None` at the last stop.
    pub fn advance_after(&self, current: usize, route: &RouteContext) -> Option<Duration> {
        route
            .edge_from(current)
            .map(|edge| edge.travel_time.as_duration().saturating_sub(self.lead))
    }

    /// Evaluate one tick.
    ///
    /// Returns the next stop index when the time since `since` has reached the
    /// edge travel time minus the lead. Advances at most one stop per tick and
    /// never past the last stop.
    pub fn tick(&self, now: Instant, since: Instant, current: usize, route: &RouteContext) -> Option<usize> {
        let threshold = self.advance_after(current, route)?;
        let elapsed = now.saturating_duration_since(since);

        (elapsed >= threshold).then_some(current + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimetro_transit::{Stop, TravelTime};

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

    fn clock() -> EstimationClock {
        EstimationClock::new(Duration::from_secs(30))
    }

    #[test]
    fn test_advance_boundary() {
        let route = line();
        let since = Instant::now();

        // 3 minutes minus 30 seconds
        assert_eq!(clock().tick(since + Duration::from_secs(149), since, 0, &route), None);
        assert_eq!(clock().tick(since + Duration::from_millis(149_999), since, 0, &route), None);
        assert_eq!(clock().tick(since + Duration::from_secs(150), since, 0, &route), Some(1));
        assert_eq!(clock().tick(since + Duration::from_secs(151), since, 0, &route), Some(1));
    }

    #[test]
    fn test_second_edge_uses_its_own_time() {
        let route = line();
        let since = Instant::now();

        assert_eq!(clock().tick(since + Duration::from_secs(209), since, 1, &route), None);
        assert_eq!(clock().tick(since + Duration::from_secs(210), since, 1, &route), Some(2));
    }

    #[test]
    fn test_one_stop_per_tick() {
        let route = line();
        let since = Instant::now();

        // Even after the whole journey has elapsed only one stop is advanced
        assert_eq!(clock().tick(since + Duration::from_secs(3600), since, 0, &route), Some(1));
    }

    #[test]
    fn test_inert_at_last_stop() {
        let route = line();
        let since = Instant::now();

        assert_eq!(clock().tick(since + Duration::from_secs(3600), since, 2, &route), None);
        assert_eq!(clock().advance_after(2, &route), None);
    }

    #[test]
    fn test_lead_longer_than_edge() {
        let stops = vec![Stop::new("a", "A", 0.0, 0.0), Stop::new("b", "B", 0.0, 0.01)];
        let times = vec![TravelTime::from_minutes(0.25).unwrap()];
        let route = RouteContext::new("r", stops, times).unwrap();
        let since = Instant::now();

        // 15 second edge with a 30 second lead advances on the next evaluation
        assert_eq!(clock().tick(since, since, 0, &route), Some(1));
    }
}
