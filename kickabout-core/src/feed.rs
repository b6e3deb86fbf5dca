use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{Message, MessageId, RoomId};

/// What part of the change feed a subscription observes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Changes to messages in a single room
    Room(RoomId),
    /// Changes to messages in any room the user can see
    AllMessages,
}

/// A change to the messages collection, as published by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum MessageChange {
    Inserted { message: Message },
    Updated { message: Message },
    Deleted { id: MessageId, room_id: RoomId },
}

impl FeedScope {
    pub fn matches(&self, change: &MessageChange) -> bool {
        match self {
            Self::AllMessages => true,
            Self::Room(room_id) => change.room_id() == *room_id,
        }
    }
}

impl MessageChange {
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::Inserted { message } | Self::Updated { message } => message.room_id,
            Self::Deleted { room_id, .. } => *room_id,
        }
    }
}

/// A live handle to a change feed.
///
/// Dropping the subscription releases whatever the backend registered for it,
/// so a subscription can never outlive its holder.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<MessageChange>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(receiver: mpsc::UnboundedReceiver<MessageChange>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Waits for the next change. Returns None once the feed has closed.
    pub async fn recv(&mut self) -> Option<MessageChange> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = MessageChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::UserId;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn message_in(room_id: RoomId) -> Message {
        Message {
            id: MessageId::assigned(),
            room_id,
            sender_id: UserId::new(),
            content: "up for a game?".to_string(),
            created_at: Utc::now(),
            is_read: false,
        }
    }

    #[test]
    fn test_scope_matching() {
        let room_id = RoomId::new();
        let change = MessageChange::Inserted {
            message: message_in(room_id),
        };

        assert!(FeedScope::AllMessages.matches(&change));
        assert!(FeedScope::Room(room_id).matches(&change));
        assert!(!FeedScope::Room(RoomId::new()).matches(&change));
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();

        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = Subscription::new(receiver, move || flag.store(true, Ordering::SeqCst));

        sender
            .send(MessageChange::Deleted {
                id: MessageId::assigned(),
                room_id: RoomId::new(),
            })
            .unwrap();

        drop(subscription);
        assert!(released.load(Ordering::SeqCst), "release should run on drop");
    }
}
