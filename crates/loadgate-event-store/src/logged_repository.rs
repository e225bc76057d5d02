//! Outbox-backed event repository.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use loadgate_bus::MessageBus;
use loadgate_core::error::DomainError;
use loadgate_core::event::Event;
use loadgate_core::message::Message;
use loadgate_core::repository::{EventRepository, EventStore, UnpublishedLog};

/// [`EventRepository`] that sequences "store then publish" through an
/// unpublished-event log.
///
/// Every append goes to the log first; a replay pass then walks the log
/// in order — store insert, bus publish, pop. A failure anywhere leaves
/// the event queued, so the next append (or the next startup, with
/// persistent backings) retries it. Idempotent store inserts absorb the
/// re-inserts a retry produces.
pub struct LoggedEventRepository {
    bus: Arc<dyn MessageBus>,
    event_store: Arc<dyn EventStore>,
    unpublished_log: Arc<dyn UnpublishedLog>,
}

impl LoggedEventRepository {
    /// Creates the repository and runs one replay pass, publishing
    /// whatever a previous run left in the log.
    ///
    /// # Errors
    ///
    /// Returns the first storage or publish error hit during hydration.
    pub async fn new(
        bus: Arc<dyn MessageBus>,
        event_store: Arc<dyn EventStore>,
        unpublished_log: Arc<dyn UnpublishedLog>,
    ) -> Result<Self, DomainError> {
        let repo = Self {
            bus,
            event_store,
            unpublished_log,
        };
        repo.drain_log().await?;
        Ok(repo)
    }

    async fn drain_log(&self) -> Result<(), DomainError> {
        let events = self.unpublished_log.events().await?;

        for event in events {
            self.event_store.insert(event.clone()).await?;

            self.bus
                .publish(Message::Event(event.clone()))
                .await
                .map_err(|err| DomainError::Infrastructure(err.to_string()))?;

            self.unpublished_log.pop(&event).await?;
            trace!(event = %event.id(), action = %event.action(), "stored and published event");
        }

        Ok(())
    }
}

#[async_trait]
impl EventRepository for LoggedEventRepository {
    async fn insert_and_publish(&self, event: Event) -> Result<(), DomainError> {
        self.unpublished_log.insert(event).await?;
        self.drain_log().await
    }

    async fn fetch(&self, aggregate_id: &str) -> Result<Vec<Event>, DomainError> {
        self.event_store.fetch(aggregate_id).await
    }

    async fn fetch_by_index(&self, index: usize) -> Result<Vec<Event>, DomainError> {
        self.event_store.fetch_by_index(index).await
    }
}
