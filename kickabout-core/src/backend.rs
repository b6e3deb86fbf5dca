use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Activity, DiscoveryFilter, FeedScope, MatchPreferences, Message, NewMessage, NewProfile,
    OAuthGrant, OAuthProvider, PageRequest, Profile, ProfileUpdate, Result, RoomId, RoomSummary,
    Session, Subscription, UserActivity, UserId,
};

/// The full backend boundary. Everything the client needs from the hosted
/// backend goes through these four collaborators.
pub trait Backend: Identity + Records + ChangeFeed + FileStore + Send + Sync {}

impl<T> Backend for T where T: Identity + Records + ChangeFeed + FileStore + Send + Sync {}

pub type SharedBackend = Arc<dyn Backend>;

/// Represents a service that can authenticate users and issue sessions
#[async_trait]
pub trait Identity: Send + Sync {
    /// Sends a one-time sign in code to the given address,
    /// creating an account on first use
    async fn request_otp(&self, email: &str) -> Result<()>;
    /// Exchanges a one-time code for a session
    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session>;

    /// Returns the URL the user should open to sign in with an external provider
    async fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: &str)
        -> Result<String>;
    /// Finishes an external sign in with the credentials from the callback
    async fn exchange_oauth(&self, grant: OAuthGrant) -> Result<Session>;

    /// Exchanges a refresh token for a fresh session
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;
    /// Returns the session this device is currently signed in with, if any
    async fn current_session(&self) -> Result<Option<Session>>;
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// Represents a service that can fetch and store kickabout records
#[async_trait]
pub trait Records: Send + Sync {
    /// Returns the profile if one exists. A missing profile is a normal state
    /// for a fresh account, not an error.
    async fn profile_by_id(&self, user_id: UserId) -> Result<Option<Profile>>;
    async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile>;
    async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile>;
    async fn browse_profiles(
        &self,
        filter: &DiscoveryFilter,
        page: PageRequest,
    ) -> Result<Vec<Profile>>;

    /// Searches the activity catalog by name. An empty query lists everything.
    async fn search_activities(&self, query: &str, page: PageRequest) -> Result<Vec<Activity>>;
    async fn activities_for(&self, user_id: UserId) -> Result<Vec<UserActivity>>;
    /// Replaces the user's activity rows with the given set
    async fn replace_user_activities(&self, user_id: UserId, rows: Vec<UserActivity>)
        -> Result<()>;
    async fn create_match_preferences(&self, preferences: MatchPreferences) -> Result<()>;

    /// Returns one page of a room's history, newest first
    async fn messages_page(&self, room_id: RoomId, page: PageRequest) -> Result<Vec<Message>>;
    /// Stores a message, assigning its id and timestamp
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message>;
    /// Marks every message in the room not sent by `reader_id` as read
    async fn mark_room_read(&self, room_id: RoomId, reader_id: UserId) -> Result<()>;

    /// Returns the chat room overview for a user
    async fn my_rooms(&self, user_id: UserId) -> Result<Vec<RoomSummary>>;
    /// Returns the room shared by two users, creating it if needed.
    /// The same pair always maps to the same room, in either order.
    async fn room_for_pair(&self, a: UserId, b: UserId) -> Result<RoomId>;
}

/// Represents a service that publishes live changes to the messages collection
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, scope: FeedScope) -> Result<Subscription>;
}

/// Represents an object store for user uploaded files
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()>;

    /// Returns the publicly reachable URL for an object
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
