//! Command handlers for the transaction-creation context.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use loadgate_bus::{MessageBus, Subscription};
use loadgate_core::action::{CmdAction, EventAction};
use loadgate_core::command::Command;
use loadgate_core::error::DomainError;
use loadgate_core::event::Event;
use loadgate_core::message::Message;
use loadgate_core::repository::EventRepository;

use crate::domain::requests::{LoadRequest, LoadRequestFailure, build_transaction};

/// Bus-driven listener translating `CreateTxn` commands into
/// `TxnCreated` / `TxnCreateFailed` events.
pub struct TxnCommandListener {
    bus: Arc<dyn MessageBus>,
    repository: Arc<dyn EventRepository>,
    default_time_format: String,
    subscription: Subscription,
}

impl TxnCommandListener {
    /// Subscribes to `CreateTxn`.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the bus refuses the
    /// subscription.
    pub async fn subscribe(
        bus: Arc<dyn MessageBus>,
        repository: Arc<dyn EventRepository>,
        default_time_format: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let subscription = bus.subscribe(CmdAction::CreateTxn.as_str()).await?;
        Ok(Self {
            bus,
            repository,
            default_time_format: default_time_format.into(),
            subscription,
        })
    }

    /// Drives the listener until cancellation or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns the first decoding or publish error hit while handling a
    /// command. Request validation failures are not errors; they are
    /// emitted as `TxnCreateFailed` events.
    pub async fn run(mut self, token: CancellationToken) -> Result<(), DomainError> {
        info!("starting command listener");

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!("received cancellation signal");
                    self.bus.unsubscribe(&self.subscription).await?;
                    return Ok(());
                }
                message = self.subscription.recv() => {
                    let Some(message) = message else { return Ok(()) };
                    let Message::Command(command) = message else {
                        warn!("expected a command on the CreateTxn topic");
                        continue;
                    };
                    if command.data().is_empty() {
                        debug!(command = %command.id(), "ignored command with empty payload");
                        continue;
                    }
                    handle_create_txn(
                        &command,
                        self.repository.as_ref(),
                        &self.default_time_format,
                    )
                    .await?;
                }
            }
        }
    }
}

/// Handles one `CreateTxn` command: validate the request and persist
/// exactly one of `TxnCreated` or `TxnCreateFailed`.
///
/// # Errors
///
/// Returns `DomainError` if the command payload is not a load request or
/// the outcome event cannot be appended.
pub async fn handle_create_txn(
    command: &Command,
    repository: &dyn EventRepository,
    default_time_format: &str,
) -> Result<(), DomainError> {
    let request: LoadRequest = command.decode()?;
    trace!(command = %command.id(), request = %request.id, "creating transaction");

    let event = match build_transaction(&request, default_time_format) {
        Ok(txn) => Event::new(EventAction::TxnCreated, &txn.id, &txn)?,
        Err(err) => {
            let failure = LoadRequestFailure {
                txn_request: request,
                error: format!("error creating transaction from load request: {err}"),
            };
            // The transaction never existed, so there is no aggregate id
            // to attach the failure to.
            Event::new(EventAction::TxnCreateFailed, "-", &failure)?
        }
    };

    trace!(command = %command.id(), action = %event.action(), "publishing result event");
    repository
        .insert_and_publish(event.with_correlation_key(command.id()))
        .await
}
