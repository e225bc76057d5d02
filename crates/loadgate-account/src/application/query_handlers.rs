//! Query-side projection for the account context.
//!
//! The transaction-result view trails the account event stream: every
//! admission event on the bus triggers a pull of all not-yet-consumed
//! events from the event store, in global order, so the report reflects
//! exactly the store's ordering regardless of bus interleaving.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use loadgate_bus::{MessageBus, Subscription};
use loadgate_core::action::EventAction;
use loadgate_core::error::DomainError;
use loadgate_core::message::Message;
use loadgate_core::repository::EventRepository;

use crate::domain::events::{AccountState, TxnFailure};
use crate::read_model::{TxnResultEntry, TxnResultRepository};

/// Incremental projection from account admission events to
/// [`TxnResultEntry`] lines.
pub struct TxnResultView {
    repository: Arc<dyn EventRepository>,
    results: Arc<dyn TxnResultRepository>,
}

impl TxnResultView {
    /// Creates a view reading events from `repository` and writing
    /// results to `results`.
    #[must_use]
    pub fn new(repository: Arc<dyn EventRepository>, results: Arc<dyn TxnResultRepository>) -> Self {
        Self {
            repository,
            results,
        }
    }

    /// Pulls every event the view has not consumed yet and folds each
    /// into the result repository.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for undecodable payloads and a
    /// validation error for actions that do not belong to the account
    /// stream; both are fatal to the projection.
    pub async fn hydrate(&self) -> Result<(), DomainError> {
        let index = self.results.index().await;
        let events = self.repository.fetch_by_index(index).await?;
        trace!(index, count = events.len(), "hydrating projection");

        for event in events {
            let entry = match event.action() {
                EventAction::AccountDeposited | EventAction::AccountWithdrawn => {
                    let state: AccountState = event.decode()?;
                    TxnResultEntry {
                        id: state.txn_id,
                        customer_id: state.cust_id,
                        accepted: true,
                    }
                }
                EventAction::DuplicateTxn | EventAction::AccountLimitExceeded => {
                    let failure: TxnFailure = event.decode()?;
                    TxnResultEntry {
                        id: failure.txn.id,
                        customer_id: failure.txn.customer_id,
                        accepted: false,
                    }
                }
                other => {
                    return Err(DomainError::Validation(format!(
                        "unexpected action '{other}' in account event stream"
                    )));
                }
            };
            self.results.insert(entry).await?;
        }

        Ok(())
    }
}

/// Bus-driven listener that re-hydrates the view on every admission
/// event.
pub struct ResultViewListener {
    bus: Arc<dyn MessageBus>,
    view: TxnResultView,
    deposited: Subscription,
    withdrawn: Subscription,
    limit_exceeded: Subscription,
    duplicate: Subscription,
}

impl ResultViewListener {
    /// Subscribes to the four account admission topics.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the bus refuses a subscription.
    pub async fn subscribe(
        bus: Arc<dyn MessageBus>,
        view: TxnResultView,
    ) -> Result<Self, DomainError> {
        let deposited = bus.subscribe(EventAction::AccountDeposited.as_str()).await?;
        let withdrawn = bus.subscribe(EventAction::AccountWithdrawn.as_str()).await?;
        let limit_exceeded = bus
            .subscribe(EventAction::AccountLimitExceeded.as_str())
            .await?;
        let duplicate = bus.subscribe(EventAction::DuplicateTxn.as_str()).await?;

        Ok(Self {
            bus,
            view,
            deposited,
            withdrawn,
            limit_exceeded,
            duplicate,
        })
    }

    /// Drives the listener until cancellation or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns the first hydration error, which is fatal to the
    /// projection.
    pub async fn run(mut self, token: CancellationToken) -> Result<(), DomainError> {
        info!("starting event listener");

        loop {
            let message = tokio::select! {
                () = token.cancelled() => {
                    debug!("received cancellation signal");
                    for subscription in [
                        &self.deposited,
                        &self.withdrawn,
                        &self.limit_exceeded,
                        &self.duplicate,
                    ] {
                        self.bus.unsubscribe(subscription).await?;
                    }
                    return Ok(());
                }
                message = self.deposited.recv() => message,
                message = self.withdrawn.recv() => message,
                message = self.limit_exceeded.recv() => message,
                message = self.duplicate.recv() => message,
            };

            match message {
                Some(Message::Event(_)) => self.view.hydrate().await?,
                Some(Message::Command(_)) => {
                    warn!("expected an event on an account admission topic");
                }
                None => return Ok(()),
            }
        }
    }
}
