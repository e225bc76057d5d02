//! Events — facts recording state changed, addressed by action tag and
//! aggregate id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::action::EventAction;
use crate::error::DomainError;

/// A fact recording that state changed.
///
/// Same shape as [`Command`](crate::command::Command) plus the owning
/// aggregate id and a replay flag. Aggregate ids are validated non-blank
/// at construction; ids and timestamps are always set.
#[derive(Debug, Clone)]
pub struct Event {
    id: Uuid,
    aggregate_id: String,
    correlation_key: Option<Uuid>,
    time: DateTime<Utc>,
    action: EventAction,
    data: Vec<u8>,
    is_replay: bool,
}

impl Event {
    /// Creates an event with a JSON-encoded payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::BlankAggregateId` if `aggregate_id` is empty,
    /// or `DomainError::Serialization` if the payload cannot be encoded.
    pub fn new<T: Serialize>(
        action: EventAction,
        aggregate_id: impl Into<String>,
        payload: &T,
    ) -> Result<Self, DomainError> {
        let data = serde_json::to_vec(payload)?;
        Self::from_bytes(action, aggregate_id, data)
    }

    /// Creates an event carrying the payload bytes verbatim.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::BlankAggregateId` if `aggregate_id` is empty.
    pub fn from_bytes(
        action: EventAction,
        aggregate_id: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self, DomainError> {
        let aggregate_id = aggregate_id.into();
        if aggregate_id.is_empty() {
            return Err(DomainError::BlankAggregateId);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            aggregate_id,
            correlation_key: None,
            time: Utc::now(),
            action,
            data,
            is_replay: false,
        })
    }

    /// Sets the correlation key linking this event to the message that
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

    /// Marks this event as a replayed fact rather than a fresh one.
    #[must_use]
    pub fn as_replay(mut self) -> Self {
        self.is_replay = true;
        self
    }

    /// Returns the event id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the owning aggregate id.
    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
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
    pub fn action(&self) -> EventAction {
        self.action
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns whether this event is a replayed fact.
    #[must_use]
    pub fn is_replay(&self) -> bool {
        self.is_replay
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
