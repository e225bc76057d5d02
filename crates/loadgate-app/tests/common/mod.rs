//! Shared helpers for pipeline integration tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use loadgate_account::domain::aggregates::AccountLimits;
use loadgate_account::read_model::{MemoryTxnResultRepository, TxnResultEntry};
use loadgate_bus::{MemoryBus, MessageBus};
use loadgate_core::repository::EventRepository;
use loadgate_event_store::{LoggedEventRepository, MemoryEventStore, MemoryUnpublishedLog};
use loadgate_test_support::SharedLineSink;

use loadgate_app::config::DEFAULT_TIME_FORMAT;
use loadgate_app::error::RunnerError;
use loadgate_app::runner::{PipelineConfig, run_pipeline};

/// Default limits used by the binary: 5000/day, 3 txns/day, 20000/week.
pub fn default_limits() -> AccountLimits {
    AccountLimits {
        daily_amount: 5000.0,
        daily_count: 3,
        weekly_amount: 20000.0,
        weekly_count: 0,
    }
}

/// Builds one input line in the wire format the reader consumes.
pub fn request_line(id: &str, customer_id: &str, load_amount: &str, time: &str) -> String {
    format!(
        r#"{{"id":"{id}","customer_id":"{customer_id}","load_amount":"{load_amount}","time":"{time}"}}"#
    )
}

/// Outcome of a full pipeline run over in-memory IO.
pub struct PipelineRun {
    /// Captured output sink.
    pub sink: SharedLineSink,
    /// What the supervisor returned.
    pub result: Result<(), RunnerError>,
}

impl PipelineRun {
    /// Parses the captured report into result entries.
    pub fn report_entries(&self) -> Vec<TxnResultEntry> {
        self.sink
            .contents()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("report lines must be valid JSON"))
            .collect()
    }

    /// Returns the accepted flag for one id/customer pair, if present
    /// exactly once in the report.
    pub fn accepted(&self, id: &str, customer_id: &str) -> Option<bool> {
        let entries = self.report_entries();
        let matches: Vec<&TxnResultEntry> = entries
            .iter()
            .filter(|entry| entry.id == id && entry.customer_id == customer_id)
            .collect();
        match matches.as_slice() {
            [entry] => Some(entry.accepted),
            _ => None,
        }
    }
}

/// Runs the whole pipeline over the given request lines, mirroring the
/// wiring in `main.rs` with in-memory IO and a short quiescence window.
pub async fn run_with_requests(lines: &[String], limits: AccountLimits) -> PipelineRun {
    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());

    let account_repository = repository(&bus).await;
    let txn_repository = repository(&bus).await;
    let writer_repository = repository(&bus).await;
    let result_repository = Arc::new(MemoryTxnResultRepository::new());

    let input = Cursor::new(lines.join("\n").into_bytes());
    let sink = SharedLineSink::new();

    let result = run_pipeline(PipelineConfig {
        bus,
        account_repository,
        txn_repository,
        writer_repository,
        result_repository,
        input,
        output: sink.clone(),
        limits,
        default_time_format: DEFAULT_TIME_FORMAT.to_owned(),
        post_read_wait: Duration::from_millis(750),
        report_written_timeout: Duration::from_secs(3),
    })
    .await;

    PipelineRun { sink, result }
}

async fn repository(bus: &Arc<dyn MessageBus>) -> Arc<dyn EventRepository> {
    Arc::new(
        LoggedEventRepository::new(
            Arc::clone(bus),
            Arc::new(MemoryEventStore::new()),
            Arc::new(MemoryUnpublishedLog::new()),
        )
        .await
        .expect("hydrating an empty unpublished log cannot fail"),
    )
}
