use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use kickabout_core::{Message, Profile, RoomId, Session};

pub type EventSender = UnboundedSender<ClientEvent>;
pub type EventReceiver = UnboundedReceiver<ClientEvent>;

/// Events emitted by the client for the screens to react to
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The user signed in or out
    SessionChanged { session: Option<Session> },
    /// The backend rejected the session, and the user was signed out
    SessionExpired,
    /// The signed in user's profile was created or changed
    ProfileUpdated { profile: Profile },
    /// Another user's message arrived in an open room
    MessageReceived { room_id: RoomId, message: Message },
    /// Something changed in some room, so the room overview is stale
    RoomListChanged,
}
