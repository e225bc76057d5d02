//! In-memory append-only event store.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use loadgate_core::error::DomainError;
use loadgate_core::event::Event;
use loadgate_core::repository::EventStore;

#[derive(Default)]
struct StoreInner {
    /// Per-aggregate buckets, insertion-ordered.
    buckets: HashMap<String, Vec<Event>>,
    /// The single totally ordered log across all aggregates.
    log: Vec<Event>,
    /// Ids already stored, for idempotent insert.
    seen: HashSet<Uuid>,
}

/// In-memory [`EventStore`] without persistence.
///
/// The global log mirrors the per-aggregate buckets; an event's index is
/// its position in the log. No pagination, the use case never needs it.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<StoreInner>,
}

impl MemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of events in the global log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().log.len()
    }

    /// Returns whether the store holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreInner> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: Event) -> Result<(), DomainError> {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if inner.seen.contains(&event.id()) {
            return Ok(());
        }
        // Unreachable through Event's validated constructors; kept as a
        // store-integrity check for alternative Event sources.
        if event.aggregate_id().is_empty() {
            return Err(DomainError::BlankAggregateId);
        }

        inner.seen.insert(event.id());
        inner
            .buckets
            .entry(event.aggregate_id().to_owned())
            .or_default()
            .push(event.clone());
        inner.log.push(event);
        Ok(())
    }

    async fn fetch(&self, aggregate_id: &str) -> Result<Vec<Event>, DomainError> {
        Ok(self.read().buckets.get(aggregate_id).cloned().unwrap_or_default())
    }

    async fn fetch_by_index(&self, index: usize) -> Result<Vec<Event>, DomainError> {
        let inner = self.read();
        Ok(inner.log.get(index..).map(<[Event]>::to_vec).unwrap_or_default())
    }
}
