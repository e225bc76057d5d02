//! Loadgate pipeline entry point.

use std::sync::Arc;

use loadgate_account::read_model::MemoryTxnResultRepository;
use loadgate_bus::{MemoryBus, MessageBus};
use loadgate_core::repository::EventRepository;
use loadgate_event_store::{LoggedEventRepository, MemoryEventStore, MemoryUnpublishedLog};

use loadgate_app::config::AppConfig;
use loadgate_app::runner::{PipelineConfig, run_pipeline};
use loadgate_app::telemetry;

async fn event_repository(bus: &Arc<dyn MessageBus>) -> Arc<dyn EventRepository> {
    let repository = LoggedEventRepository::new(
        Arc::clone(bus),
        Arc::new(MemoryEventStore::new()),
        Arc::new(MemoryUnpublishedLog::new()),
    )
    .await
    .expect("hydrating an empty unpublished log cannot fail");
    Arc::new(repository)
}

#[tokio::main]
async fn main() {
    telemetry::init();
    let config = AppConfig::from_env();

    tracing::info!(
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        "starting loadgate pipeline"
    );

    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
    let account_repository = event_repository(&bus).await;
    let txn_repository = event_repository(&bus).await;
    let writer_repository = event_repository(&bus).await;
    let result_repository = Arc::new(MemoryTxnResultRepository::new());

    let input = tokio::fs::File::open(&config.input_path)
        .await
        .expect("failed to open input file");
    let output = tokio::fs::File::create(&config.output_path)
        .await
        .expect("failed to create output file");

    let pipeline = PipelineConfig {
        bus,
        account_repository,
        txn_repository,
        writer_repository,
        result_repository,
        input,
        output,
        limits: config.limits,
        default_time_format: config.default_time_format,
        post_read_wait: config.post_read_wait,
        report_written_timeout: config.report_written_timeout,
    };

    if let Err(err) = run_pipeline(pipeline).await {
        tracing::error!(%err, "pipeline failed");
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing::info!("pipeline finished");
}
