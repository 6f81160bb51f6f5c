//! Core data types for route data.

use std::time::Duration;

use geo::Point;

use crate::identifiers::*;
use crate::spatial::is_valid_coordinate;

// ============================================================================
// Data Structures
// ============================================================================

/// A station along a route.
///
/// `location` follows the `geo` convention: x is longitude, y is latitude,
/// both in degrees.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stop {
    pub id: StopIdentifier,
    pub name: String,
    pub location: Point,
}

impl Stop {
    pub fn new(id: impl Into<StopIdentifier>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: Point::new(longitude, latitude),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.location.y()
    }

    pub fn longitude(&self) -> f64 {
        self.location.x()
    }
}

/// Expected travel time between two adjacent stops, in minutes.
///
/// Always positive and finite; construction rejects anything else so that an
/// estimation clock can never divide its way into a stuck or instant advance.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "f64", into = "f64"))]
pub struct TravelTime(f64);

impl TravelTime {
    pub fn from_minutes(minutes: f64) -> Result<Self> {
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(TransitError::InvalidTravelTime(minutes));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(&self) -> f64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.0 * 60.0)
    }
}

impl TryFrom<f64> for TravelTime {
    type Error = TransitError;

    fn try_from(minutes: f64) -> Result<Self> {
        Self::from_minutes(minutes)
    }
}

impl From<TravelTime> for f64 {
    fn from(value: TravelTime) -> Self {
        value.0
    }
}

/// Directed segment between two consecutive stops of a route.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub from: StopIdentifier,
    pub to: StopIdentifier,
    pub travel_time: TravelTime,
}

impl Edge {
    pub fn new(from: impl Into<StopIdentifier>, to: impl Into<StopIdentifier>, travel_time: TravelTime) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            travel_time,
        }
    }
}

pub(crate) fn validate_stop(stop: &Stop) -> Result<()> {
    if is_valid_coordinate(stop.location) {
        Ok(())
    } else {
        Err(TransitError::InvalidCoordinate(stop.id.clone()))
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Route has no stops")]
    EmptyRoute,

    #[error("Stop appears more than once: {0}")]
    DuplicateStop(StopIdentifier),

    #[error("Expected {expected} travel times for the route, got {actual}")]
    EdgeCountMismatch { expected: usize, actual: usize },

    #[error("No edge between {from} and {to}")]
    MissingEdge { from: StopIdentifier, to: StopIdentifier },

    #[error("More than one edge between {from} and {to}")]
    DuplicateEdge { from: StopIdentifier, to: StopIdentifier },

    #[error("Invalid travel time: {0} minutes")]
    InvalidTravelTime(f64),

    #[error("Stop has an invalid coordinate: {0}")]
    InvalidCoordinate(StopIdentifier),

    #[error("Stop not found: {0}")]
    StopNotFound(StopIdentifier),

    #[error("Stop index {index} is out of range for a route of {len} stops")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, TransitError>;
