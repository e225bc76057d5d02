//! Event storage and repository traits.
//!
//! The in-memory implementations live in `loadgate-event-store`; these
//! traits are what the domain crates program against, so persistent
//! backends can be substituted without touching them.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::Event;

/// Append-only event storage with a per-aggregate view and a single
/// totally ordered log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Inserts an event. Re-inserting an already stored event id is a
    /// no-op, which is what makes outbox replay safe.
    async fn insert(&self, event: Event) -> Result<(), DomainError>;

    /// Returns all events for one aggregate in insertion order.
    async fn fetch(&self, aggregate_id: &str) -> Result<Vec<Event>, DomainError>;

    /// Returns all events with global index `>= index`. The index of an
    /// event is its position in insertion order across all aggregates.
    async fn fetch_by_index(&self, index: usize) -> Result<Vec<Event>, DomainError>;
}

/// Holding pen for events that have not completed the store-then-publish
/// sequence yet. Exists to bridge the lack of atomicity between storing
/// an event and publishing it.
#[async_trait]
pub trait UnpublishedLog: Send + Sync {
    /// Appends an event to the log.
    async fn insert(&self, event: Event) -> Result<(), DomainError>;

    /// Removes an event from the log by id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EventNotFound` if the event is not present.
    async fn pop(&self, event: &Event) -> Result<(), DomainError>;

    /// Returns a snapshot of all pending events.
    async fn events(&self) -> Result<Vec<Event>, DomainError>;
}

/// Repository combining durable storage with bus publication.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Stores the event, then publishes it. On failure the event stays
    /// queued so the next call retries it.
    async fn insert_and_publish(&self, event: Event) -> Result<(), DomainError>;

    /// Returns all events for one aggregate in insertion order.
    async fn fetch(&self, aggregate_id: &str) -> Result<Vec<Event>, DomainError>;

    /// Returns all events with global index `>= index`.
    async fn fetch_by_index(&self, index: usize) -> Result<Vec<Event>, DomainError>;
}
