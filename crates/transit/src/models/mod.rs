//! Route data models and error types.

pub mod types;

// Re-exports for convenience
pub use types::{Edge, Result, Stop, TransitError, TravelTime};
