//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An event was constructed without an aggregate id.
    #[error("aggregate id is blank")]
    BlankAggregateId,

    /// A payload failed to encode or decode.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An event expected in a store or log was absent.
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    /// An infrastructure error (bus delivery, storage).
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
