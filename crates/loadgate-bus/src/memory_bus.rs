//! In-memory implementation of the message bus.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use loadgate_core::message::Message;

use crate::error::BusError;
use crate::subscription::Subscription;
use crate::{MessageBus, SUBSCRIPTION_CAPACITY};

/// Bus-side half of one subscription.
#[derive(Clone)]
struct TopicSender {
    id: Uuid,
    sender: mpsc::Sender<Message>,
    closed: CancellationToken,
}

/// In-memory [`MessageBus`] without persistence.
///
/// A reader-writer lock protects the action-to-subscribers map; `publish`
/// snapshots the subscriber list under the read lock and releases it
/// before any send, so no lock is ever held across an await. Each
/// subscription carries a close signal that send operations race against,
/// which is what keeps publishers from blocking on a full channel while
/// the subscription is being torn down.
pub struct MemoryBus {
    capacity: usize,
    terminating: AtomicBool,
    topics: RwLock<HashMap<String, Vec<TopicSender>>>,
}

impl MemoryBus {
    /// Creates a bus with the default subscriber capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(SUBSCRIPTION_CAPACITY)
    }

    /// Creates a bus whose subscriber channels buffer `capacity` messages.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            terminating: AtomicBool::new(false),
            topics: RwLock::new(HashMap::new()),
        }
    }

    fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    /// Returns the number of live subscriptions for one action.
    #[must_use]
    pub fn subscriber_count(&self, action: &str) -> usize {
        self.topics
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(action)
            .map_or(0, Vec::len)
    }

    fn snapshot(&self, action: &str) -> Vec<TopicSender> {
        self.topics
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(action)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        if self.is_terminating() {
            return Err(BusError::Terminating);
        }

        let action = message.action_tag();
        let id = message.id();
        trace!(action, %id, "received message");

        let subscribers = self.snapshot(action);
        trace!(action, count = subscribers.len(), "delivering to subscribers");
        if subscribers.is_empty() {
            warn!(action, "no subscribers found for action");
            return Ok(());
        }

        for subscriber in subscribers {
            tokio::select! {
                biased;
                () = subscriber.closed.cancelled() => {
                    trace!(action, subscription = %subscriber.id, "skipping closed subscription");
                }
                result = subscriber.sender.send(message.clone()) => {
                    if result.is_err() {
                        trace!(action, subscription = %subscriber.id, "subscription receiver dropped");
                    }
                }
            }
        }
        trace!(action, %id, "published message");

        Ok(())
    }

    async fn subscribe(&self, action: &str) -> Result<Subscription, BusError> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();
        let closed = CancellationToken::new();

        let mut topics = self
            .topics
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Re-checked under the lock so a concurrent terminate either sees
        // this subscription or this call sees the terminating flag.
        if self.is_terminating() {
            return Err(BusError::Terminating);
        }

        debug!(action, subscription = %id, "adding subscription");
        topics.entry(action.to_owned()).or_default().push(TopicSender {
            id,
            sender,
            closed: closed.clone(),
        });

        Ok(Subscription::new(id, action.to_owned(), receiver, closed))
    }

    async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), BusError> {
        let action = subscription.action();

        let mut topics = self
            .topics
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let found = topics.get_mut(action).and_then(|subscribers| {
            subscribers
                .iter()
                .position(|s| s.id == subscription.id())
                .map(|index| subscribers.swap_remove(index))
        });

        match found {
            Some(removed) => {
                removed.closed.cancel();
                debug!(action, subscription = %removed.id, "unsubscribed from topic");
                Ok(())
            }
            // Terminate already tore the subscription down.
            None if self.is_terminating() => Ok(()),
            None => Err(BusError::UnknownSubscription(action.to_owned())),
        }
    }

    fn terminate(&self) {
        if self.terminating.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!("terminating bus");
        let mut topics = self
            .topics
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for (action, subscribers) in topics.drain() {
            for subscriber in subscribers {
                subscriber.closed.cancel();
            }
            trace!(action, "closed topic");
        }
        debug!("bus terminated");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::timeout;

    use loadgate_core::action::{CmdAction, EventAction};
    use loadgate_core::command::Command;
    use loadgate_core::event::Event;

    use super::*;

    fn read_event() -> Message {
        Event::from_bytes(EventAction::TxnRead, "agg-1", b"line".to_vec())
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_succeeds() {
        let bus = MemoryBus::new();
        bus.publish(read_event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_publish_order() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("TxnRead").await.unwrap();

        let first = read_event();
        let second = read_event();
        let (first_id, second_id) = (first.id(), second.id());

        bus.publish(first).await.unwrap();
        bus.publish(second).await.unwrap();

        assert_eq!(sub.recv().await.unwrap().id(), first_id);
        assert_eq!(sub.recv().await.unwrap().id(), second_id);
    }

    #[tokio::test]
    async fn test_every_subscriber_of_action_receives_message() {
        let bus = MemoryBus::new();
        let mut sub_a = bus.subscribe("TxnRead").await.unwrap();
        let mut sub_b = bus.subscribe("TxnRead").await.unwrap();
        let mut other = bus.subscribe("TxnCreated").await.unwrap();

        let message = read_event();
        let id = message.id();
        bus.publish(message).await.unwrap();

        assert_eq!(sub_a.recv().await.unwrap().id(), id);
        assert_eq!(sub_b.recv().await.unwrap().id(), id);
        assert!(
            timeout(Duration::from_millis(20), other.recv())
                .await
                .is_err(),
            "subscriber of another action must not receive the message"
        );
    }

    #[tokio::test]
    async fn test_commands_and_events_share_topic_namespace() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe(CmdAction::ProcessTxn.as_str()).await.unwrap();

        bus.publish(Command::from_bytes(CmdAction::ProcessTxn, Vec::new()).into())
            .await
            .unwrap();

        assert!(matches!(sub.recv().await, Some(Message::Command(_))));
    }

    #[tokio::test]
    async fn test_publish_backpressures_on_full_subscriber() {
        let bus = Arc::new(MemoryBus::new());
        let mut sub = bus.subscribe("TxnRead").await.unwrap();

        let publisher = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                for _ in 0..3 {
                    bus.publish(read_event()).await.unwrap();
                }
            })
        };

        // Capacity is 2, so the third publish must still be pending.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!publisher.is_finished());

        sub.recv().await.unwrap();
        timeout(Duration::from_secs(1), publisher)
            .await
            .expect("publisher must unblock once the subscriber drains")
            .unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_receiver_and_stops_delivery() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("TxnRead").await.unwrap();

        bus.unsubscribe(&sub).await.unwrap();

        assert!(sub.recv().await.is_none());
        assert_eq!(bus.subscriber_count("TxnRead"), 0);
        // Publishing afterwards hits the no-subscriber path and succeeds.
        bus.publish(read_event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_double_unsubscribe_is_an_error() {
        let bus = MemoryBus::new();
        let sub = bus.subscribe("TxnRead").await.unwrap();

        bus.unsubscribe(&sub).await.unwrap();
        let result = bus.unsubscribe(&sub).await;

        assert!(matches!(result, Err(BusError::UnknownSubscription(_))));
    }

    #[tokio::test]
    async fn test_publish_and_subscribe_fail_after_terminate() {
        let bus = MemoryBus::new();
        bus.terminate();

        assert!(matches!(
            bus.publish(read_event()).await,
            Err(BusError::Terminating)
        ));
        assert!(matches!(
            bus.subscribe("TxnRead").await,
            Err(BusError::Terminating)
        ));
    }

    #[tokio::test]
    async fn test_terminate_closes_every_subscriber() {
        let bus = MemoryBus::new();
        let mut sub_a = bus.subscribe("TxnRead").await.unwrap();
        let mut sub_b = bus.subscribe("TxnCreated").await.unwrap();

        bus.terminate();

        assert!(sub_a.recv().await.is_none());
        assert!(sub_b.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_terminate_is_idempotent_and_unsubscribe_tolerated() {
        let bus = MemoryBus::new();
        let sub = bus.subscribe("TxnRead").await.unwrap();

        bus.terminate();
        bus.terminate();

        bus.unsubscribe(&sub).await.unwrap();
    }

    #[tokio::test]
    async fn test_terminate_releases_publisher_blocked_on_full_channel() {
        let bus = Arc::new(MemoryBus::new());
        let _sub = bus.subscribe("TxnRead").await.unwrap();

        let publisher = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                // Nobody drains the subscriber, so this blocks on the
                // third message until termination releases it.
                for _ in 0..3 {
                    if bus.publish(read_event()).await.is_err() {
                        break;
                    }
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!publisher.is_finished());

        bus.terminate();
        timeout(Duration::from_secs(1), publisher)
            .await
            .expect("terminate must release blocked publishers")
            .unwrap();
    }

    #[tokio::test]
    async fn test_buffered_messages_are_discarded_on_terminate() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("TxnRead").await.unwrap();

        bus.publish(read_event()).await.unwrap();
        bus.terminate();

        assert!(sub.recv().await.is_none());
    }
}
