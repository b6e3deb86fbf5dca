mod activities;
mod auth;
mod chats;
mod discovery;
mod events;
mod notifications;
mod profiles;
mod wizard;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

pub use activities::*;
pub use auth::*;
pub use chats::*;
pub use discovery::*;
pub use events::*;
pub use notifications::*;
pub use profiles::*;
pub use wizard::*;

use kickabout_core::{BackendError, Profile, Session, SharedBackend, UserId};
use tokio::sync::mpsc::unbounded_channel;

/// The kickabout client, tying the screens to the backend collaborators.
pub struct Client {
    context: ClientContext,

    pub auth: SessionManager,
    pub profiles: ProfileService,
    pub activities: ActivityService,
    pub discovery: DiscoveryService,
    pub chats: ChatManager,
    pub notifications: NotificationsFeed,
}

/// A type passed to the services of the client, to access the backend,
/// the current session, and the event channel.
pub struct ClientContext {
    pub backend: SharedBackend,

    event_sender: EventSender,
    session: Arc<Mutex<Option<Session>>>,
    profile: Arc<Mutex<Option<Profile>>>,
    /// Ensures a rejected session only forces a sign out once
    expiry_notified: Arc<AtomicBool>,
}

impl Client {
    /// Creates a client on top of a backend. The returned receiver carries
    /// every [ClientEvent] the screens should react to.
    pub fn new(backend: SharedBackend) -> (Self, EventReceiver) {
        let (event_sender, event_receiver) = unbounded_channel();

        let context = ClientContext {
            backend,
            event_sender,
            session: Default::default(),
            profile: Default::default(),
            expiry_notified: Default::default(),
        };

        let client = Self {
            auth: SessionManager::new(&context),
            profiles: ProfileService::new(&context),
            activities: ActivityService::new(&context),
            discovery: DiscoveryService::new(&context),
            chats: ChatManager::new(&context),
            notifications: NotificationsFeed::new(&context),
            context,
        };

        (client, event_receiver)
    }

    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    /// Reports an error that surfaced on a screen, so an expired session
    /// signs the user out.
    pub fn report(&self, error: &BackendError) {
        self.context.report_error(error)
    }
}

impl ClientContext {
    pub fn emit(&self, event: ClientEvent) {
        self.event_sender.send(event).ok();
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.session.lock().as_ref().map(|s| s.user_id())
    }

    /// The signed in user, or an error for call sites that require one
    pub fn require_user(&self) -> Result<UserId, BackendError> {
        self.current_user()
            .ok_or_else(|| BackendError::Unauthorized("not signed in".to_string()))
    }

    /// The signed in user's own profile, if loaded
    pub fn current_profile(&self) -> Option<Profile> {
        self.profile.lock().clone()
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        *self.session.lock() = session.clone();
        self.expiry_notified.store(false, Ordering::SeqCst);

        if session.is_none() {
            *self.profile.lock() = None;
        }

        self.emit(ClientEvent::SessionChanged { session });
    }

    pub(crate) fn set_profile(&self, profile: Profile) {
        *self.profile.lock() = Some(profile.clone());
        self.emit(ClientEvent::ProfileUpdated { profile });
    }

    /// Inspects a backend error and forces a sign out if the session was
    /// rejected. Safe to call from any task, fires at most once per session.
    pub fn report_error(&self, error: &BackendError) {
        if !error.is_unauthorized() {
            return;
        }

        if self.current_session().is_none() {
            return;
        }

        if self.expiry_notified.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.session.lock() = None;
        *self.profile.lock() = None;
        self.emit(ClientEvent::SessionChanged { session: None });
        self.emit(ClientEvent::SessionExpired);
    }
}

impl Clone for ClientContext {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            event_sender: self.event_sender.clone(),
            session: self.session.clone(),
            profile: self.profile.clone(),
            expiry_notified: self.expiry_notified.clone(),
        }
    }
}
