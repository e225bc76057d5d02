//! Test repositories — mock `EventRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use loadgate_core::error::DomainError;
use loadgate_core::event::Event;
use loadgate_core::repository::EventRepository;

/// An event repository over a seeded in-memory log that records every
/// `insert_and_publish` call instead of touching a bus.
pub struct RecordingEventRepository {
    events: Mutex<Vec<Event>>,
    published: Mutex<Vec<Event>>,
}

impl RecordingEventRepository {
    /// Creates a repository whose log starts with `existing` events.
    #[must_use]
    pub fn new(existing: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(existing),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all events appended via
    /// `insert_and_publish`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published_events(&self) -> Vec<Event> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn insert_and_publish(&self, event: Event) -> Result<(), DomainError> {
        self.events.lock().unwrap().push(event.clone());
        self.published.lock().unwrap().push(event);
        Ok(())
    }

    async fn fetch(&self, aggregate_id: &str) -> Result<Vec<Event>, DomainError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.aggregate_id() == aggregate_id)
            .cloned()
            .collect())
    }

    async fn fetch_by_index(&self, index: usize) -> Result<Vec<Event>, DomainError> {
        let events = self.events.lock().unwrap();
        Ok(events.get(index..).map(<[Event]>::to_vec).unwrap_or_default())
    }
}

/// An event repository that always fails with an infrastructure error.
/// Useful for exercising error-handling paths.
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn insert_and_publish(&self, _event: Event) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure(
            "event repository unavailable".to_owned(),
        ))
    }

    async fn fetch(&self, _aggregate_id: &str) -> Result<Vec<Event>, DomainError> {
        Err(DomainError::Infrastructure(
            "event repository unavailable".to_owned(),
        ))
    }

    async fn fetch_by_index(&self, _index: usize) -> Result<Vec<Event>, DomainError> {
        Err(DomainError::Infrastructure(
            "event repository unavailable".to_owned(),
        ))
    }
}
