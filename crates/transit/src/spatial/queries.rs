//! Spatial query utilities for distance calculations.
//!
//! Uses the Haversine formula for distances on Earth's surface.

use geo::{Distance, Haversine, Point};

/// Calculate Haversine distance between two points in meters
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    Haversine.distance(p1, p2)
}

/// Whether a point is a usable geographic coordinate (x = longitude, y = latitude).
pub fn is_valid_coordinate(point: Point) -> bool {
    let (lon, lat) = (point.x(), point.y());
    lon.is_finite() && lat.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}
