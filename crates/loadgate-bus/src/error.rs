//! Bus error types.

use thiserror::Error;

use loadgate_core::error::DomainError;

/// Errors surfaced by bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus is terminating; no further publishes or subscriptions.
    #[error("bus is terminating")]
    Terminating,

    /// Unsubscribe found no matching live subscription.
    #[error("no matching subscription for action '{0}'")]
    UnknownSubscription(String),
}

impl From<BusError> for DomainError {
    fn from(err: BusError) -> Self {
        Self::Infrastructure(err.to_string())
    }
}
