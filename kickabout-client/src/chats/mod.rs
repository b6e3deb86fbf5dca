mod room;
mod room_list;
mod timeline;

use std::sync::Arc;

use kickabout_core::{BackendError, UserId};

pub use room::ChatRoom;
pub use room_list::RoomList;
pub use timeline::{Timeline, TimelineSnapshot};

use crate::ClientContext;

/// Entry point for the chat surfaces
pub struct ChatManager {
    context: ClientContext,
}

impl ChatManager {
    pub(crate) fn new(context: &ClientContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Opens the conversation with another user, creating the room on first
    /// contact. The first page of history is loaded before this returns.
    pub async fn open(&self, other_user: UserId) -> Result<Arc<ChatRoom>, BackendError> {
        ChatRoom::open(self.context.clone(), other_user).await
    }

    /// Opens the chat overview and keeps it fresh until dropped
    pub async fn watch_rooms(&self) -> Result<Arc<RoomList>, BackendError> {
        RoomList::open(self.context.clone()).await
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use kickabout_backend::MemoryBackend;
    use kickabout_core::{MessageId, NewMessage, PageRequest, Records, SharedBackend};

    use super::*;
    use crate::{Client, ClientEvent, EventReceiver};

    async fn signed_in(backend: &Arc<MemoryBackend>, email: &str) -> (Client, EventReceiver) {
        let shared: SharedBackend = backend.clone();
        let (client, events) = Client::new(shared);

        client
            .auth
            .request_code(email)
            .await
            .expect("code should be requested");

        let code = backend.issued_code(email).expect("a code should be issued");

        client
            .auth
            .verify_code(email, &code)
            .await
            .expect("sign in should succeed");

        (client, events)
    }

    async fn eventually<F>(check: F, description: &str)
    where
        F: Fn() -> bool,
    {
        for _ in 0..100 {
            if check() {
                return;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        panic!("timed out waiting until {}", description);
    }

    fn drain(events: &mut EventReceiver) -> Vec<ClientEvent> {
        let mut drained = Vec::new();

        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }

        drained
    }

    #[tokio::test]
    async fn test_blank_messages_send_nothing() {
        let backend = Arc::new(MemoryBackend::new());
        let (alice, _) = signed_in(&backend, "alice@example.com").await;
        let (bob, _) = signed_in(&backend, "bob@example.com").await;

        let bob_id = bob.context().current_user().unwrap();
        let room = alice.chats.open(bob_id).await.unwrap();

        assert!(room.send("").await.unwrap().is_none());
        assert!(room.send("  \n\t ").await.unwrap().is_none());

        assert!(room.messages().is_empty(), "nothing should be echoed");

        let stored = backend
            .messages_page(room.id(), PageRequest::messages(0))
            .await
            .unwrap();
        assert!(stored.is_empty(), "nothing should be written");
    }

    #[tokio::test]
    async fn test_sending_keeps_exactly_one_copy() {
        let backend = Arc::new(MemoryBackend::new());
        let (alice, _) = signed_in(&backend, "alice@example.com").await;
        let (bob, _) = signed_in(&backend, "bob@example.com").await;

        let bob_id = bob.context().current_user().unwrap();
        let room = alice.chats.open(bob_id).await.unwrap();

        let stored = room
            .send("up for five a side?")
            .await
            .expect("send should succeed")
            .expect("non-blank input should store a message");

        assert!(matches!(stored.id, MessageId::Assigned(_)));

        // Give the change feed time to echo the insert back
        tokio::time::sleep(Duration::from_millis(50)).await;

        let messages = room.messages();
        assert_eq!(messages.len(), 1, "the echo and the feed must not both count");
        assert_eq!(messages[0].id, stored.id);
        assert_eq!(messages[0].content, "up for five a side?");
    }

    #[tokio::test]
    async fn test_messages_reach_the_other_side() {
        let backend = Arc::new(MemoryBackend::new());
        let (alice, _) = signed_in(&backend, "alice@example.com").await;
        let (bob, mut bob_events) = signed_in(&backend, "bob@example.com").await;

        let alice_id = alice.context().current_user().unwrap();
        let bob_id = bob.context().current_user().unwrap();

        let alice_room = alice.chats.open(bob_id).await.unwrap();
        let bob_room = bob.chats.open(alice_id).await.unwrap();

        assert_eq!(alice_room.id(), bob_room.id(), "both sides share one room");

        alice_room.send("pitch at eight?").await.unwrap();

        let receiving = bob_room.clone();
        eventually(
            move || receiving.messages().len() == 1,
            "the message reaches the other side",
        )
        .await;

        assert_eq!(bob_room.messages()[0].content, "pitch at eight?");

        let received = drain(&mut bob_events);
        assert!(
            received
                .iter()
                .any(|event| matches!(event, ClientEvent::MessageReceived { .. })),
            "an event should announce the message"
        );
    }

    #[tokio::test]
    async fn test_failed_send_restores_the_timeline() {
        let backend = Arc::new(MemoryBackend::new());
        let (alice, _) = signed_in(&backend, "alice@example.com").await;
        let (bob, _) = signed_in(&backend, "bob@example.com").await;

        let bob_id = bob.context().current_user().unwrap();
        let room = alice.chats.open(bob_id).await.unwrap();

        room.send("first").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let before = room.messages();

        backend.fail_next_write();
        let result = room.send("second").await;

        assert!(result.is_err(), "the write should have been rejected");
        assert_eq!(room.messages(), before, "a failed send must leave no trace");

        // The backend recovers, so the retry goes through
        room.send("second").await.unwrap();
        assert_eq!(room.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_unread_counts_and_mark_read() {
        let backend = Arc::new(MemoryBackend::new());
        let (alice, _) = signed_in(&backend, "alice@example.com").await;
        let (bob, _) = signed_in(&backend, "bob@example.com").await;

        let alice_id = alice.context().current_user().unwrap();
        let bob_id = bob.context().current_user().unwrap();

        let alice_room = alice.chats.open(bob_id).await.unwrap();
        alice_room.send("free tonight?").await.unwrap();
        alice_room.send("bring shin pads").await.unwrap();

        let rooms = backend.my_rooms(bob_id).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].unread_count, 2);

        // Opening the room marks it read in the background
        let bob_room = bob.chats.open(alice_id).await.unwrap();

        let mut cleared = false;
        for _ in 0..100 {
            let rooms = backend.my_rooms(bob_id).await.unwrap();

            if rooms[0].unread_count == 0 {
                cleared = true;
                break;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(cleared, "opening the room should clear the unread count");

        // The read receipts travel back to the sender
        let sender_side = alice_room.clone();
        eventually(
            move || sender_side.messages().iter().all(|message| message.is_read),
            "read receipts reach the sender",
        )
        .await;

        // Marking again changes nothing
        bob_room.mark_read();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let rooms = backend.my_rooms(bob_id).await.unwrap();
        assert_eq!(rooms[0].unread_count, 0);
        assert_eq!(bob_room.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_overview_goes_stale_on_any_change() {
        let backend = Arc::new(MemoryBackend::new());
        let (alice, _) = signed_in(&backend, "alice@example.com").await;
        let (bob, mut bob_events) = signed_in(&backend, "bob@example.com").await;

        let bob_id = bob.context().current_user().unwrap();

        let overview = bob.chats.watch_rooms().await.unwrap();
        assert!(!overview.is_stale());
        assert_eq!(overview.total_unread(), 0);

        let room = alice.chats.open(bob_id).await.unwrap();
        room.send("match on saturday").await.unwrap();

        let watching = overview.clone();
        eventually(
            move || watching.is_stale(),
            "the overview notices the change",
        )
        .await;

        assert!(
            drain(&mut bob_events)
                .iter()
                .any(|event| matches!(event, ClientEvent::RoomListChanged)),
            "an event should announce the stale overview"
        );

        let rooms = overview.refresh().await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].unread_count, 1);
        assert_eq!(
            rooms[0].last_message_content.as_deref(),
            Some("match on saturday")
        );
        assert_eq!(overview.total_unread(), 1);
        assert!(!overview.is_stale());
    }

    #[tokio::test]
    async fn test_paging_through_history() {
        let backend = Arc::new(MemoryBackend::new());
        let (alice, _) = signed_in(&backend, "alice@example.com").await;
        let (bob, _) = signed_in(&backend, "bob@example.com").await;

        let alice_id = alice.context().current_user().unwrap();
        let bob_id = bob.context().current_user().unwrap();

        let room_id = backend.room_for_pair(alice_id, bob_id).await.unwrap();

        for number in 0..25 {
            backend
                .insert_message(NewMessage {
                    room_id,
                    sender_id: alice_id,
                    content: format!("kick {}", number),
                })
                .await
                .unwrap();
        }

        let room = bob.chats.open(alice_id).await.unwrap();

        assert_eq!(room.messages().len(), 20, "the first page loads on open");
        assert!(room.has_more());

        assert!(room.load_older().await.unwrap());
        assert_eq!(room.messages().len(), 25);
        assert!(!room.has_more());

        let contents: Vec<_> = room
            .messages()
            .into_iter()
            .map(|message| message.content)
            .collect();
        assert_eq!(contents.first().map(String::as_str), Some("kick 0"));
        assert_eq!(contents.last().map(String::as_str), Some("kick 24"));

        assert!(
            !room.load_older().await.unwrap(),
            "the history is exhausted"
        );
    }
}
