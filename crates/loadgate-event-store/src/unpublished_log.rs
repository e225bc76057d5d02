//! In-memory outbox log.

use std::sync::RwLock;

use async_trait::async_trait;

use loadgate_core::error::DomainError;
use loadgate_core::event::Event;
use loadgate_core::repository::UnpublishedLog;

/// In-memory [`UnpublishedLog`] without persistence.
#[derive(Default)]
pub struct MemoryUnpublishedLog {
    events: RwLock<Vec<Event>>,
}

impl MemoryUnpublishedLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnpublishedLog for MemoryUnpublishedLog {
    async fn insert(&self, event: Event) -> Result<(), DomainError> {
        self.events
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
        Ok(())
    }

    async fn pop(&self, event: &Event) -> Result<(), DomainError> {
        let mut events = self
            .events
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let index = events
            .iter()
            .position(|e| e.id() == event.id())
            .ok_or_else(|| DomainError::EventNotFound(event.id()))?;
        events.remove(index);
        Ok(())
    }

    async fn events(&self) -> Result<Vec<Event>, DomainError> {
        Ok(self
            .events
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }
}
