//! Subscriber-side handle for one topic registration.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use loadgate_core::message::Message;

/// A live subscription to one action topic.
///
/// The bus retains the sending half; this handle owns the bounded
/// receiver plus the close signal the bus fires on unsubscribe or
/// termination.
pub struct Subscription {
    id: Uuid,
    action: String,
    receiver: mpsc::Receiver<Message>,
    closed: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(
        id: Uuid,
        action: String,
        receiver: mpsc::Receiver<Message>,
        closed: CancellationToken,
    ) -> Self {
        Self {
            id,
            action,
            receiver,
            closed,
        }
    }

    /// Returns the subscription id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the action tag this subscription is registered for.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Receives the next message in publication order.
    ///
    /// Resolves to `None` once the subscription is closed; messages still
    /// buffered at close time are discarded.
    pub async fn recv(&mut self) -> Option<Message> {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => None,
            message = self.receiver.recv() => message,
        }
    }
}
