use std::time::Duration;

use nimetro_transit::TransitError;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] TransitError),

    #[error("Invalid tracker configuration: {0}")]
    InvalidConfig(String),

    #[error("Tracking session inbox is full")]
    InboxFull,

    #[error("Tracking session has ended")]
    SessionClosed,
}

/// Failure reported by a position source.
///
/// Never fatal to a session: the driver logs it and keeps estimating.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Position source is unavailable")]
    Unavailable,

    #[error("Position source did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Position source failed: {0}")]
    Provider(String),
}
