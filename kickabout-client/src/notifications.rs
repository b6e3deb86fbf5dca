use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use kickabout_core::{BackendError, RoomId};

use crate::ClientContext;

/// A single entry on the notifications screen
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub at: DateTime<Utc>,
    /// Set when the notification can be opened as a chat
    pub room_id: Option<RoomId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Unread chat messages
    Message,
    /// Something the client itself wants the user to know
    System,
}

/// Produces the notifications screen content.
///
/// There is no notifications collection in the backend. Message entries are
/// derived from the room overview, and system notices are kept locally.
pub struct NotificationsFeed {
    context: ClientContext,
    notices: Mutex<Vec<Notification>>,
}

impl NotificationsFeed {
    pub fn new(context: &ClientContext) -> Self {
        Self {
            context: context.clone(),
            notices: Default::default(),
        }
    }

    /// Adds a local system notice
    pub fn notify(&self, title: &str, body: &str) {
        self.notices.lock().push(Notification {
            kind: NotificationKind::System,
            title: title.to_string(),
            body: body.to_string(),
            at: Utc::now(),
            room_id: None,
        });
    }

    /// Returns all current notifications, newest first
    pub async fn current(&self) -> Result<Vec<Notification>, BackendError> {
        let user_id = self.context.require_user()?;
        let rooms = self.context.backend.my_rooms(user_id).await?;

        let mut notifications: Vec<Notification> = rooms
            .into_iter()
            .filter(|room| room.unread_count > 0)
            .map(|room| Notification {
                kind: NotificationKind::Message,
                title: room.other_user_name,
                body: match room.unread_count {
                    1 => "1 new message".to_string(),
                    n => format!("{} new messages", n),
                },
                at: room.last_message_at.unwrap_or_else(Utc::now),
                room_id: Some(room.room_id),
            })
            .collect();

        notifications.extend(self.notices.lock().iter().cloned());
        notifications.sort_by(|a, b| b.at.cmp(&a.at));

        Ok(notifications)
    }
}
