//! Transaction-result read model.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::trace;

use loadgate_core::error::DomainError;

/// One line of the transaction-result report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnResultEntry {
    /// Transaction id.
    pub id: String,
    /// Customer the transaction belongs to.
    pub customer_id: String,
    /// Whether the transaction was accepted.
    pub accepted: bool,
}

/// Storage for transaction results, consumed in event order.
///
/// `index` is the count of entries consumed so far, which doubles as the
/// cursor for the projection's next pull from the event store.
#[async_trait]
pub trait TxnResultRepository: Send + Sync {
    /// Consumes one result entry. Each id/customer pair is reported at
    /// most once: later entries for a pair already in the report are
    /// counted but not written.
    async fn insert(&self, entry: TxnResultEntry) -> Result<(), DomainError>;

    /// Returns the report: one JSON object per line, no trailing newline.
    async fn serialized(&self) -> String;

    /// Returns the number of results consumed so far.
    async fn index(&self) -> usize;
}

#[derive(Default)]
struct RepoInner {
    buffer: Vec<u8>,
    index: usize,
    seen: HashSet<(String, String)>,
}

/// In-memory [`TxnResultRepository`] keeping the report pre-serialized.
#[derive(Default)]
pub struct MemoryTxnResultRepository {
    inner: RwLock<RepoInner>,
}

impl MemoryTxnResultRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TxnResultRepository for MemoryTxnResultRepository {
    async fn insert(&self, entry: TxnResultEntry) -> Result<(), DomainError> {
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // The cursor advances for every consumed entry, written or not.
        inner.index += 1;
        let key = (entry.id, entry.customer_id);
        if inner.seen.contains(&key) {
            trace!(id = %key.0, customer = %key.1, "skipping already reported transaction");
            return Ok(());
        }
        inner.seen.insert(key);
        inner.buffer.extend_from_slice(&line);
        Ok(())
    }

    async fn serialized(&self) -> String {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut report = String::from_utf8_lossy(&inner.buffer).into_owned();
        if report.ends_with('\n') {
            report.pop();
        }
        report
    }

    async fn index(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .index
    }
}
