//! Commands — intents to change state, addressed by action tag.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::action::CmdAction;
use crate::error::DomainError;

/// An intent to change state, addressed by action tag.
///
/// Commands are immutable after construction. Payloads supplied as raw
/// bytes are stored verbatim; anything else is JSON-encoded.
#[derive(Debug, Clone)]
pub struct Command {
    id: Uuid,
    correlation_key: Option<Uuid>,
    time: DateTime<Utc>,
    action: CmdAction,
    data: Vec<u8>,
}

impl Command {
    /// Creates a command with a JSON-encoded payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload cannot be
    /// encoded.
    pub fn new<T: Serialize>(action: CmdAction, payload: &T) -> Result<Self, DomainError> {
        let data = serde_json::to_vec(payload)?;
        Ok(Self::from_bytes(action, data))
    }

    /// Creates a command carrying the payload bytes verbatim.
    #[must_use]
    pub fn from_bytes(action: CmdAction, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_key: None,
            time: Utc::now(),
            action,
            data,
        }
    }

    /// Sets the correlation key linking this command to the message that
    /// caused it.
    #[must_use]
    pub fn with_correlation_key(mut self, key: Uuid) -> Self {
        self.correlation_key = Some(key);
        self
    }

    /// Overrides the creation timestamp.
    #[must_use]
    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Returns the command id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the correlation key, if one was set.
    #[must_use]
    pub fn correlation_key(&self) -> Option<Uuid> {
        self.correlation_key
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Returns the action tag.
    #[must_use]
    pub fn action(&self) -> CmdAction {
        self.action
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decodes the JSON payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload is not valid
    /// JSON for `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}
