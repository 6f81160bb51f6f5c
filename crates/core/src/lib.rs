pub mod tracking;

// Re-export transit from the transit crate
pub use nimetro_transit as transit;
