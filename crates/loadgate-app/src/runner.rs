//! The routine supervisor: starts every component, watches for the first
//! exit, and drains the pipeline in reverse dependency order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use loadgate_account::application::command_handlers::AccountCommandListener;
use loadgate_account::application::query_handlers::{ResultViewListener, TxnResultView};
use loadgate_account::domain::aggregates::AccountLimits;
use loadgate_account::read_model::TxnResultRepository;
use loadgate_bus::MessageBus;
use loadgate_core::repository::EventRepository;
use loadgate_txn::application::command_handlers::TxnCommandListener;

use crate::error::{ComponentError, RunnerError};
use crate::process_manager::ProcessManager;
use crate::reader::LineReader;
use crate::writer::ReportWriter;

/// Everything the supervisor needs to assemble the pipeline.
///
/// Each producing component (account, transaction creator, writer) gets
/// its own event repository; they share the one bus. The projection
/// reads from the account's repository.
pub struct PipelineConfig<R, W> {
    /// The shared message bus.
    pub bus: Arc<dyn MessageBus>,
    /// Event repository backing the account aggregate.
    pub account_repository: Arc<dyn EventRepository>,
    /// Event repository backing the transaction creator.
    pub txn_repository: Arc<dyn EventRepository>,
    /// Event repository backing the report writer.
    pub writer_repository: Arc<dyn EventRepository>,
    /// The transaction-result read model.
    pub result_repository: Arc<dyn TxnResultRepository>,
    /// Source of request lines.
    pub input: R,
    /// Sink for the report.
    pub output: W,
    /// Per-customer deposit limits.
    pub limits: AccountLimits,
    /// Format for request times without an explicit override.
    pub default_time_format: String,
    /// Quiescence window before teardown begins.
    pub post_read_wait: Duration,
    /// Acknowledgment budget for the report handshake.
    pub report_written_timeout: Duration,
}

struct RunningComponent {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<Result<(), ComponentError>>,
}

fn spawn_component<F, Fut>(
    name: &'static str,
    main_cancel: &CancellationToken,
    component: F,
) -> RunningComponent
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    let token = CancellationToken::new();
    let future = component(token.clone());
    let main_cancel = main_cancel.clone();
    let handle = tokio::spawn(async move {
        let result = future.await;
        info!(component = name, "component returned");
        // Any single component finishing, cleanly or not, starts global
        // shutdown.
        main_cancel.cancel();
        result
    });
    RunningComponent {
        name,
        token,
        handle,
    }
}

fn startup_failure(component: &'static str, err: impl std::fmt::Display) -> RunnerError {
    RunnerError {
        failures: vec![(component, err.to_string())],
    }
}

/// Runs the whole pipeline to completion.
///
/// Components subscribe in dependency order before any of them starts, so
/// no published message can miss a subscriber that is still starting up.
/// After the first component exits, the supervisor waits out the
/// quiescence window, then cancels and joins Reader, TxnCreator, Account,
/// ProcessManager, Projection, and Writer in that order, terminates the
/// bus, and reports every component failure in one composite error.
///
/// # Errors
///
/// Returns [`RunnerError`] naming each failed component.
pub async fn run_pipeline<R, W>(config: PipelineConfig<R, W>) -> Result<(), RunnerError>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let main_cancel = CancellationToken::new();

    // Subscription phase, dependency order.
    let process_manager = ProcessManager::subscribe(
        Arc::clone(&config.bus),
        Arc::clone(&config.result_repository),
        config.report_written_timeout,
    )
    .await
    .map_err(|err| startup_failure("processMgr", err))?;

    let txn_creator = TxnCommandListener::subscribe(
        Arc::clone(&config.bus),
        Arc::clone(&config.txn_repository),
        config.default_time_format.clone(),
    )
    .await
    .map_err(|err| startup_failure("txnCreator", err))?;

    let account = AccountCommandListener::subscribe(
        Arc::clone(&config.bus),
        Arc::clone(&config.account_repository),
        config.limits,
    )
    .await
    .map_err(|err| startup_failure("account", err))?;

    let view = TxnResultView::new(
        Arc::clone(&config.account_repository),
        Arc::clone(&config.result_repository),
    );
    let projection = ResultViewListener::subscribe(Arc::clone(&config.bus), view)
        .await
        .map_err(|err| startup_failure("txnResultView", err))?;

    let writer = ReportWriter::subscribe(
        config.output,
        Arc::clone(&config.bus),
        Arc::clone(&config.writer_repository),
    )
    .await
    .map_err(|err| startup_failure("writer", err))?;

    let reader = LineReader::new(config.input, Arc::clone(&config.bus));

    // Run phase, same order as subscription.
    let process_manager =
        spawn_component("processMgr", &main_cancel, |token| process_manager.run(token));
    let txn_creator = spawn_component("txnCreator", &main_cancel, |token| async move {
        txn_creator.run(token).await.map_err(ComponentError::from)
    });
    let account = spawn_component("account", &main_cancel, |token| async move {
        account.run(token).await.map_err(ComponentError::from)
    });
    let projection = spawn_component("txnResultView", &main_cancel, |token| async move {
        projection.run(token).await.map_err(ComponentError::from)
    });
    let writer = spawn_component("writer", &main_cancel, |token| writer.run(token));
    let reader = spawn_component("reader", &main_cancel, |token| reader.run(token));

    // The first component to return (normally the reader hitting end of
    // input) trips this; the quiescence window then lets in-flight
    // events settle before teardown starts.
    main_cancel.cancelled().await;
    debug!("shutdown triggered, waiting out the quiescence window");
    tokio::time::sleep(config.post_read_wait).await;

    let mut failures: Vec<(&'static str, String)> = Vec::new();
    for component in [
        reader,
        txn_creator,
        account,
        process_manager,
        projection,
        writer,
    ] {
        component.token.cancel();
        debug!(component = component.name, "waiting for component to return");
        match component.handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => failures.push((component.name, err.to_string())),
            Err(join_err) => failures.push((component.name, join_err.to_string())),
        }
    }

    config.bus.terminate();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(RunnerError { failures })
    }
}
