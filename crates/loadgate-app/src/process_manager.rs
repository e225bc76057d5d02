//! The read → create → process saga coordinator.
//!
//! The process manager closes the loop between read events and domain
//! commands, and drives the final report on shutdown. Because bus
//! delivery is synchronous, any publish that can recurse through this
//! loop (an event whose handling publishes a command whose handling
//! publishes another event this loop subscribes to) is dispatched from a
//! spawned task; publishing inline would deadlock the selection loop on
//! its own downstream traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use loadgate_account::read_model::TxnResultRepository;
use loadgate_bus::{MessageBus, Subscription};
use loadgate_core::action::{CmdAction, EventAction};
use loadgate_core::command::Command;
use loadgate_core::message::Message;
use loadgate_txn::domain::requests::LoadRequestFailure;

use crate::error::ComponentError;

type SagaResult = Result<(), ComponentError>;

/// Coordinates the pipeline: `TxnRead` → `CreateTxn`, `TxnCreated` →
/// `ProcessTxn`, and the shutdown report handshake.
pub struct ProcessManager {
    bus: Arc<dyn MessageBus>,
    results: Arc<dyn TxnResultRepository>,
    report_written_timeout: Duration,
    txn_read: Subscription,
    txn_created: Subscription,
    txn_create_failed: Subscription,
    data_written: Option<Subscription>,
}

impl ProcessManager {
    /// Subscribes to the four saga topics.
    ///
    /// # Errors
    ///
    /// Returns a bus error if any subscription is refused.
    pub async fn subscribe(
        bus: Arc<dyn MessageBus>,
        results: Arc<dyn TxnResultRepository>,
        report_written_timeout: Duration,
    ) -> Result<Self, ComponentError> {
        let txn_read = bus.subscribe(EventAction::TxnRead.as_str()).await?;
        let txn_created = bus.subscribe(EventAction::TxnCreated.as_str()).await?;
        let txn_create_failed = bus.subscribe(EventAction::TxnCreateFailed.as_str()).await?;
        let data_written = bus.subscribe(EventAction::DataWritten.as_str()).await?;

        Ok(Self {
            bus,
            results,
            report_written_timeout,
            txn_read,
            txn_created,
            txn_create_failed,
            data_written: Some(data_written),
        })
    }

    /// Drives the saga until the report handshake completes or a fatal
    /// error surfaces.
    ///
    /// # Errors
    ///
    /// Returns publish failures from the forwarding tasks and
    /// `ReportTimeout` if no `DataWritten` acknowledgment arrives within
    /// the configured budget.
    pub async fn run(mut self, token: CancellationToken) -> Result<(), ComponentError> {
        info!("starting process manager");
        let result = self.run_loop(token).await;
        self.unsubscribe_remaining().await;
        result
    }

    async fn run_loop(&mut self, token: CancellationToken) -> Result<(), ComponentError> {
        // Collects outcomes from forwarding tasks and the report saga.
        let (saga_tx, mut saga_rx) = mpsc::channel::<SagaResult>(1);
        // The first cancellation starts the report handshake; later ones
        // must not re-trigger it.
        let mut shutdown_acknowledged = false;

        loop {
            tokio::select! {
                () = token.cancelled(), if !shutdown_acknowledged => {
                    shutdown_acknowledged = true;
                    debug!("received cancellation signal");
                    self.write_report(&saga_tx).await?;
                }
                message = self.txn_read.recv() => {
                    if !self.forward_as_command(message, CmdAction::CreateTxn, &saga_tx) {
                        return Ok(());
                    }
                }
                message = self.txn_created.recv() => {
                    if !self.forward_as_command(message, CmdAction::ProcessTxn, &saga_tx) {
                        return Ok(());
                    }
                }
                message = self.txn_create_failed.recv() => {
                    match message {
                        Some(message) => Self::log_create_failure(&message),
                        None => return Ok(()),
                    }
                }
                result = saga_rx.recv() => {
                    return result.unwrap_or(Ok(()));
                }
            }
        }
    }

    /// Publishes the serialized projection as a `WriteData` command and
    /// spawns the wait for the writer's acknowledgment.
    async fn write_report(&mut self, saga_tx: &mpsc::Sender<SagaResult>) -> Result<(), ComponentError> {
        let report = self.results.serialized().await;
        let command = Command::from_bytes(CmdAction::WriteData, report.into_bytes());
        self.bus.publish(Message::Command(command)).await?;
        debug!("waiting for response from write service");

        let Some(mut data_written) = self.data_written.take() else {
            return Ok(());
        };
        let budget = self.report_written_timeout;
        let saga_tx = saga_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                () = tokio::time::sleep(budget) => Err(ComponentError::ReportTimeout),
                message = data_written.recv() => match message {
                    Some(message) => {
                        trace!(message = %message.id(), "received data-written acknowledgment");
                        Ok(())
                    }
                    // The subscription closed without an acknowledgment.
                    None => Err(ComponentError::ReportTimeout),
                },
            };
            let _ = saga_tx.send(result).await;
        });

        Ok(())
    }

    /// Re-publishes an event's payload as a command from a spawned task.
    /// Returns `false` when the subscription has closed and the loop
    /// should exit.
    fn forward_as_command(
        &self,
        message: Option<Message>,
        action: CmdAction,
        saga_tx: &mpsc::Sender<SagaResult>,
    ) -> bool {
        let Some(message) = message else {
            return false;
        };
        let Message::Event(event) = message else {
            warn!(%action, "expected an event on a saga topic");
            return true;
        };
        trace!(event = %event.id(), event_action = %event.action(), "received event");

        let bus = Arc::clone(&self.bus);
        let saga_tx = saga_tx.clone();
        tokio::spawn(async move {
            let command =
                Command::from_bytes(action, event.data().to_vec()).with_correlation_key(event.id());
            trace!(command = %command.id(), %action, "publishing command");
            if let Err(err) = bus.publish(Message::Command(command)).await {
                let _ = saga_tx.send(Err(err.into())).await;
            }
        });
        true
    }

    fn log_create_failure(message: &Message) {
        let Message::Event(event) = message else {
            warn!("expected an event on the TxnCreateFailed topic");
            return;
        };
        match event.decode::<LoadRequestFailure>() {
            Ok(failure) => info!(
                request = %failure.txn_request.id,
                error = %failure.error,
                "failed creating transaction"
            ),
            Err(err) => warn!(%err, "could not decode TxnCreateFailed payload"),
        }
    }

    async fn unsubscribe_remaining(&mut self) {
        let mut remaining = vec![&self.txn_read, &self.txn_created, &self.txn_create_failed];
        if let Some(data_written) = &self.data_written {
            remaining.push(data_written);
        }
        for subscription in remaining {
            if let Err(err) = self.bus.unsubscribe(subscription).await {
                debug!(action = subscription.action(), %err, "unsubscribe failed during teardown");
            }
        }
    }
}
