//! Position readings and their acceptance policy.

use chrono::{DateTime, Utc};
use geo::Point;
use nimetro_transit::is_valid_coordinate;

/// A single reading from the positioning source.
///
/// `location` follows the `geo` convention (x = longitude, y = latitude).
#[derive(Clone, Debug, PartialEq)]
pub struct Fix {
    pub location: Point,
    pub recorded_at: DateTime<Utc>,
    /// Estimated horizontal accuracy radius in meters, if the source reports one.
    pub accuracy_m: Option<f64>,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            location: Point::new(longitude, latitude),
            recorded_at,
            accuracy_m: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// What a position source delivers: a fix, or an explicit "no fix right now".
#[derive(Clone, Debug, PartialEq)]
pub enum LocationUpdate {
    Fix(Fix),
    Unavailable,
}

/// Why a fix was treated as "no fix".
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FixRejection {
    #[error("coordinate is not a valid latitude/longitude")]
    InvalidCoordinate,

    #[error("accuracy {accuracy_m}m is worse than the {limit_m}m limit")]
    Inaccurate { accuracy_m: f64, limit_m: f64 },

    #[error("recorded at {recorded_at}, before the last accepted fix at {last_accepted}")]
    OutOfOrder {
        recorded_at: DateTime<Utc>,
        last_accepted: DateTime<Utc>,
    },
}

/// Check a fix against the acceptance policy.
///
/// `last_accepted` is the timestamp of the most recent accepted fix; a fix
/// recorded strictly before it arrived out of order and is dropped.
pub fn check_fix(
    fix: &Fix,
    max_accuracy_m: Option<f64>,
    last_accepted: Option<DateTime<Utc>>,
) -> Result<(), FixRejection> {
    if !is_valid_coordinate(fix.location) {
        return Err(FixRejection::InvalidCoordinate);
    }

    if let (Some(accuracy_m), Some(limit_m)) = (fix.accuracy_m, max_accuracy_m) {
        // NaN accuracy is as useless as a huge one
        if !(accuracy_m <= limit_m) {
            return Err(FixRejection::Inaccurate { accuracy_m, limit_m });
        }
    }

    if let Some(last_accepted) = last_accepted {
        if fix.recorded_at < last_accepted {
            return Err(FixRejection::OutOfOrder {
                recorded_at: fix.recorded_at,
                last_accepted,
            });
        }
    }

    Ok(())
}
