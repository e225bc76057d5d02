//! Loadgate Bus — in-process topic pub/sub.
//!
//! Components never call each other; they exchange [`Message`]s over a
//! bus keyed by action tag. Delivery is synchronous: `publish` returns
//! once every live subscriber of the topic has accepted the message into
//! its bounded channel.

use async_trait::async_trait;

use loadgate_core::message::Message;

mod error;
mod memory_bus;
mod subscription;

pub use error::BusError;
pub use memory_bus::MemoryBus;
pub use subscription::Subscription;

/// Events a subscriber can buffer before publishers back-pressure.
pub const SUBSCRIPTION_CAPACITY: usize = 2;

/// Topic-based publish/subscribe for commands and events.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Delivers `message` to every live subscriber of its action tag, in
    /// publication order per subscriber. Publishing with no subscribers
    /// logs a warning and succeeds.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Terminating` once [`terminate`](Self::terminate)
    /// has been called.
    async fn publish(&self, message: Message) -> Result<(), BusError>;

    /// Registers a subscriber for one action tag.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Terminating` once [`terminate`](Self::terminate)
    /// has been called.
    async fn subscribe(&self, action: &str) -> Result<Subscription, BusError>;

    /// Removes a subscription. The subscription's receiver observes the
    /// close on its next receive.
    ///
    /// # Errors
    ///
    /// Returns `BusError::UnknownSubscription` if the subscription is not
    /// registered (for instance when unsubscribing twice), unless the bus
    /// is terminating, in which case unsubscribing is idempotent.
    async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), BusError>;

    /// Closes every subscription and rejects further publishes and
    /// subscribes. Publishers blocked on a full subscriber channel are
    /// released. Idempotent.
    fn terminate(&self);
}
