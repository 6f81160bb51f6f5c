//! Distance and coordinate utilities.

pub mod queries;

pub use queries::{haversine_distance, is_valid_coordinate};
