use std::sync::{Arc, Weak};

use chrono::Utc;
use log::warn;
use parking_lot::Mutex;
use tokio::spawn;
use tokio::task::JoinHandle;

use kickabout_core::{
    BackendError, FeedScope, Message, MessageChange, MessageId, NewMessage, PageRequest, Profile,
    RoomId, Subscription, UserId,
};

use super::Timeline;
use crate::{ClientContext, ClientEvent};

/// An open conversation with another user.
///
/// While the room is open, a change feed subscription keeps the timeline in
/// sync with the backend. Dropping the room stops the pump, which in turn
/// releases the subscription.
pub struct ChatRoom {
    context: ClientContext,

    id: RoomId,
    viewer: UserId,
    other_profile: Option<Profile>,

    timeline: Mutex<Timeline>,
    /// Serializes sends, so every echo settles before the next one starts
    send_lock: tokio::sync::Mutex<()>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ChatRoom {
    pub(super) async fn open(
        context: ClientContext,
        other_user: UserId,
    ) -> Result<Arc<Self>, BackendError> {
        let viewer = context.require_user()?;

        let id = context.backend.room_for_pair(viewer, other_user).await?;
        let other_profile = context.backend.profile_by_id(other_user).await?;
        let subscription = context.backend.subscribe(FeedScope::Room(id)).await?;

        let room = Arc::new(Self {
            context,
            id,
            viewer,
            other_profile,
            timeline: Mutex::new(Timeline::default()),
            send_lock: tokio::sync::Mutex::new(()),
            pump: Mutex::new(None),
        });

        let task = spawn(Self::run_pump(Arc::downgrade(&room), subscription));
        *room.pump.lock() = Some(task);

        room.load_older().await?;
        room.mark_read();

        Ok(room)
    }

    /// Feeds live changes into the timeline. Holds only a weak handle, so an
    /// abandoned room drops even while the feed stays quiet.
    async fn run_pump(weak: Weak<Self>, mut subscription: Subscription) {
        while let Some(change) = subscription.recv().await {
            let Some(room) = weak.upgrade() else { break };

            room.apply_change(change);
        }
    }

    fn apply_change(&self, change: MessageChange) {
        match change {
            MessageChange::Inserted { message } => {
                let accepted = self
                    .timeline
                    .lock()
                    .apply_remote_insert(message.clone(), self.viewer);

                if accepted {
                    // The viewer is looking at the room, so the new message
                    // counts as read right away
                    self.mark_read();

                    self.context.emit(ClientEvent::MessageReceived {
                        room_id: self.id,
                        message,
                    });
                }
            }
            MessageChange::Updated { message } => {
                self.timeline.lock().apply_update(message);
            }
            MessageChange::Deleted { id, .. } => {
                self.timeline.lock().apply_delete(&id);
            }
        }
    }

    /// Sends a message, showing it in the timeline while the backend stores
    /// it. A failed send restores the timeline to the state before the
    /// attempt. Blank input sends nothing and returns `None`.
    pub async fn send(&self, content: &str) -> Result<Option<Message>, BackendError> {
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let _sending = self.send_lock.lock().await;

        let echo = Message {
            id: MessageId::local_now(),
            room_id: self.id,
            sender_id: self.viewer,
            content: content.to_string(),
            created_at: Utc::now(),
            is_read: false,
        };

        let snapshot = {
            let mut timeline = self.timeline.lock();
            let snapshot = timeline.snapshot();

            timeline.apply_local_echo(echo.clone());
            snapshot
        };

        let new_message = NewMessage {
            room_id: self.id,
            sender_id: self.viewer,
            content: content.to_string(),
        };

        match self.context.backend.insert_message(new_message).await {
            Ok(stored) => {
                self.timeline.lock().confirm_local(echo.id, stored.clone());
                Ok(Some(stored))
            }
            Err(err) => {
                self.timeline.lock().restore(snapshot);
                self.context.report_error(&err);
                Err(err)
            }
        }
    }

    /// Fetches the next page of history. Returns false when a fetch is
    /// already running or the history is exhausted.
    pub async fn load_older(&self) -> Result<bool, BackendError> {
        let Some(index) = self.timeline.lock().begin_fetch() else {
            return Ok(false);
        };

        let request = PageRequest::messages(index);

        match self.context.backend.messages_page(self.id, request).await {
            Ok(rows) => {
                self.timeline.lock().apply_page(index, rows);
                Ok(true)
            }
            Err(err) => {
                self.timeline.lock().abort_fetch();
                self.context.report_error(&err);
                Err(err)
            }
        }
    }

    /// Flags everything from the other user as read. Runs in the background,
    /// since a lost write only leaves a stale unread count until the next
    /// overview fetch.
    pub fn mark_read(&self) {
        let backend = self.context.backend.clone();
        let room_id = self.id;
        let viewer = self.viewer;

        spawn(async move {
            if let Err(err) = backend.mark_room_read(room_id, viewer).await {
                warn!("Failed to mark room {} as read: {}", room_id, err);
            }
        });
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn other_profile(&self) -> Option<&Profile> {
        self.other_profile.as_ref()
    }

    /// The name shown in the room header
    pub fn other_name(&self) -> String {
        self.other_profile
            .as_ref()
            .map(|profile| profile.name.clone())
            .unwrap_or_else(|| "Unknown player".to_string())
    }

    /// The timeline in rendering order, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.timeline.lock().display_order()
    }

    pub fn has_more(&self) -> bool {
        self.timeline.lock().has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.timeline.lock().is_loading()
    }
}

impl Drop for ChatRoom {
    fn drop(&mut self) {
        if let Some(task) = self.pump.lock().take() {
            task.abort();
        }
    }
}
