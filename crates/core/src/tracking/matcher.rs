//! Nearest-stop matching for position fixes.

use geo::Point;
use nimetro_transit::{RouteContext, haversine_distance};

use crate::tracking::fix::Fix;

/// Result of matching a position against a route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StopMatch {
    pub index: usize,
    pub distance_m: f64,
}

/// Find the stop closest to `point` by great-circle distance.
///
/// Equidistant stops resolve to the earliest one in route order. Every route
/// has at least one stop, so a match always exists.
pub fn nearest_stop(point: Point, route: &RouteContext) -> StopMatch {
    let mut best = StopMatch {
        index: 0,
        distance_m: f64::INFINITY,
    };

    for (index, stop) in route.stops().iter().enumerate() {
        let distance_m = haversine_distance(point, stop.location);
        // strict comparison keeps the earlier stop on ties
        if distance_m < best.distance_m {
            best = StopMatch { index, distance_m };
        }
    }

    best
}

pub fn match_fix(fix: &Fix, route: &RouteContext) -> StopMatch {
    nearest_stop(fix.location, route)
}
