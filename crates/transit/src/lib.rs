//! # nimetro-transit
//!
//! Route data for station tracking.
//!
//! ## Features
//!
//! - **Immutable route context**: ordered stops with an O(1) edge table
//! - **Validated input**: empty routes, duplicate stops and missing or
//!   non-positive travel times are rejected at construction
//! - **Geodesic helpers**: Haversine distance between coordinates
//!
//! ## Example
//!
//! ```
//! use nimetro_transit::prelude::*;
//! use std::time::Duration;
//!
//! let stops = vec![
//!     Stop::new("a", "Okhotny Ryad", 55.7577, 37.6156),
//!     Stop::new("b", "Lubyanka", 55.7597, 37.6265),
//!     Stop::new("c", "Chistye Prudy", 55.7650, 37.6383),
//! ];
//! let times = vec![
//!     TravelTime::from_minutes(2.0).unwrap(),
//!     TravelTime::from_minutes(3.0).unwrap(),
//! ];
//!
//! let route = RouteContext::new("sokolnicheskaya", stops, times).unwrap();
//! assert_eq!(route.len(), 3);
//! assert_eq!(route.total_travel_time(), Duration::from_secs(5 * 60));
//! ```

pub mod identifiers;
pub mod models;
pub mod route;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::types::*;
    pub use crate::route::RouteContext;
    pub use crate::spatial::{haversine_distance, is_valid_coordinate};
}

pub use prelude::*;
