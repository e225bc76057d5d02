//! Command handlers for the account context.
//!
//! The listener consumes `ProcessTxn` commands from the bus. For every
//! command a fresh aggregate is rebuilt from the customer's event stream,
//! the transaction is run through admission, and exactly one outcome
//! event is appended through the repository.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use loadgate_bus::{MessageBus, Subscription};
use loadgate_core::action::CmdAction;
use loadgate_core::command::Command;
use loadgate_core::error::DomainError;
use loadgate_core::event::Event;
use loadgate_core::message::Message;
use loadgate_core::repository::EventRepository;
use loadgate_core::transaction::Transaction;

use crate::domain::aggregates::{Account, AccountLimits, Admission};

/// Bus-driven listener translating `ProcessTxn` commands into admission
/// events.
pub struct AccountCommandListener {
    bus: Arc<dyn MessageBus>,
    repository: Arc<dyn EventRepository>,
    limits: AccountLimits,
    subscription: Subscription,
}

impl AccountCommandListener {
    /// Validates the limit configuration and subscribes to `ProcessTxn`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for inconsistent limits or an
    /// infrastructure error if the bus refuses the subscription.
    pub async fn subscribe(
        bus: Arc<dyn MessageBus>,
        repository: Arc<dyn EventRepository>,
        limits: AccountLimits,
    ) -> Result<Self, DomainError> {
        limits.validate()?;
        let subscription = bus.subscribe(CmdAction::ProcessTxn.as_str()).await?;
        Ok(Self {
            bus,
            repository,
            limits,
            subscription,
        })
    }

    /// Drives the listener until cancellation or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns the first storage, decoding, or publish error hit while
    /// handling a command.
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
                        warn!("expected a command on the ProcessTxn topic");
                        continue;
                    };
                    if command.data().is_empty() {
                        debug!(command = %command.id(), "ignored command with empty payload");
                        continue;
                    }
                    handle_process_txn(&command, self.repository.as_ref(), self.limits).await?;
                }
            }
        }
    }
}

/// Handles one `ProcessTxn` command: rebuild the customer's aggregate,
/// admit the transaction, persist the single outcome event.
///
/// # Errors
///
/// Returns `DomainError` if the payload cannot be decoded, the event
/// stream cannot be replayed, or the outcome event cannot be appended.
pub async fn handle_process_txn(
    command: &Command,
    repository: &dyn EventRepository,
    limits: AccountLimits,
) -> Result<(), DomainError> {
    let txn: Transaction = command.decode()?;
    trace!(command = %command.id(), txn = %txn.id, "processing transaction");

    let mut account = Account::new(&txn.customer_id, limits)?;
    let history = repository.fetch(&txn.customer_id).await?;
    account.replay(&history)?;

    let admission = account.admit(&txn);
    let action = admission.action(&txn);
    let event = match admission {
        Admission::Accepted(state) => Event::new(action, &txn.customer_id, &state)?,
        Admission::Rejected(failure) => Event::new(action, &txn.customer_id, &failure)?,
    };

    trace!(command = %command.id(), txn = %txn.id, %action, "publishing admission event");
    repository
        .insert_and_publish(event.with_correlation_key(command.id()))
        .await
}
