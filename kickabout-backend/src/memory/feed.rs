use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use kickabout_core::{FeedScope, MessageChange, Subscription};

/// Fans published changes out to live subscriptions
pub struct FeedRegistry {
    me: Weak<Self>,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

struct Subscriber {
    id: u64,
    scope: FeedScope,
    sender: UnboundedSender<MessageChange>,
}

impl FeedRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            next_id: AtomicU64::new(0),
            subscribers: Default::default(),
        })
    }

    /// Registers a subscription. Dropping it removes the registration.
    pub fn subscribe(&self, scope: FeedScope) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = unbounded_channel();

        self.subscribers
            .lock()
            .push(Subscriber { id, scope, sender });

        let registry = self.me.clone();

        Subscription::new(receiver, move || {
            if let Some(registry) = registry.upgrade() {
                registry.disconnect(id);
            }
        })
    }

    pub fn publish(&self, change: MessageChange) {
        let subscribers = self.subscribers.lock();

        for subscriber in subscribers.iter() {
            if subscriber.scope.matches(&change) {
                subscriber.sender.send(change.clone()).ok();
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn disconnect(&self, id: u64) {
        self.subscribers.lock().retain(|s| s.id != id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use kickabout_core::{Message, MessageId, RoomId, UserId};

    fn insert_in(room_id: RoomId) -> MessageChange {
        MessageChange::Inserted {
            message: Message {
                id: MessageId::assigned(),
                room_id,
                sender_id: UserId::new(),
                content: "anyone up for a match?".to_string(),
                created_at: Utc::now(),
                is_read: false,
            },
        }
    }

    #[tokio::test]
    async fn test_changes_reach_matching_scopes() {
        let registry = FeedRegistry::new();
        let room_id = RoomId::new();

        let mut in_room = registry.subscribe(FeedScope::Room(room_id));
        let mut elsewhere = registry.subscribe(FeedScope::Room(RoomId::new()));
        let mut everything = registry.subscribe(FeedScope::AllMessages);

        registry.publish(insert_in(room_id));

        assert!(in_room.recv().await.is_some());
        assert!(everything.recv().await.is_some());

        registry.publish(insert_in(room_id));
        drop(registry);

        // The channel for the other room never saw either change
        assert!(elsewhere.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_a_subscription_unregisters_it() {
        let registry = FeedRegistry::new();

        let first = registry.subscribe(FeedScope::AllMessages);
        let second = registry.subscribe(FeedScope::AllMessages);
        assert_eq!(registry.subscriber_count(), 2);

        drop(first);
        assert_eq!(registry.subscriber_count(), 1);

        drop(second);
        assert_eq!(registry.subscriber_count(), 0);
    }
}
