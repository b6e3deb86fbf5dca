mod feed;
mod seed;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use kickabout_core::{
    Account, Activity, ActivityId, BackendError, ChangeFeed, DiscoveryFilter, FeedScope, FileStore,
    Identity, MatchPreferences, Message, MessageChange, MessageId, NewMessage, NewProfile,
    OAuthGrant, OAuthProvider, PageRequest, Profile, ProfileUpdate, Records, Result, RoomId,
    RoomSummary, Session, Subscription, UserActivity, UserId,
};

use crate::util::{numeric_code, random_string};
use feed::FeedRegistry;

/// The address the demo town is seeded around
pub const DEMO_EMAIL: &str = "demo@kickabout.app";

const SESSION_TTL_HOURS: i64 = 1;
const TOKEN_LENGTH: usize = 32;
const OTP_DIGITS: u32 = 6;

/// An in-process stand-in for the hosted backend, for demos and tests.
///
/// Everything lives in memory and disappears with the process. The change
/// feed is fully functional, so two clients sharing one instance behave like
/// two phones talking to the same service.
pub struct MemoryBackend {
    accounts: DashMap<UserId, Account>,
    emails: DashMap<String, UserId>,
    pending_codes: DashMap<String, String>,
    pending_oauth: DashMap<String, Session>,
    refresh_tokens: DashMap<String, UserId>,
    /// The most recently issued session, like a device keychain would hold
    active_session: Mutex<Option<Session>>,

    profiles: DashMap<UserId, Profile>,
    catalog: DashMap<ActivityId, Activity>,
    user_activities: DashMap<UserId, Vec<UserActivity>>,
    match_preferences: DashMap<UserId, MatchPreferences>,

    rooms: DashMap<RoomId, (UserId, UserId)>,
    room_index: DashMap<(UserId, UserId), RoomId>,
    /// Message rows per room, oldest first. Timestamps are strictly
    /// increasing within a room, so this order matches `created_at` order.
    messages: DashMap<RoomId, Vec<Message>>,

    objects: DashMap<String, StoredObject>,

    registry: Arc<FeedRegistry>,
    fail_next_write: AtomicBool,
}

struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            accounts: Default::default(),
            emails: Default::default(),
            pending_codes: Default::default(),
            pending_oauth: Default::default(),
            refresh_tokens: Default::default(),
            active_session: Default::default(),
            profiles: Default::default(),
            catalog: Default::default(),
            user_activities: Default::default(),
            match_preferences: Default::default(),
            rooms: Default::default(),
            room_index: Default::default(),
            messages: Default::default(),
            objects: Default::default(),
            registry: FeedRegistry::new(),
            fail_next_write: AtomicBool::new(false),
        }
    }

    /// A backend preloaded with a demo town: an account for [DEMO_EMAIL],
    /// people nearby, and a few conversations
    pub fn with_demo_data() -> Self {
        let backend = Self::new();
        seed::populate(&backend);

        backend
    }

    /// Makes the next record write fail with a transport error, for
    /// exercising rollback paths
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// The code most recently issued to an address, so demos and tests can
    /// finish a sign in without a mailbox
    pub fn issued_code(&self, email: &str) -> Option<String> {
        self.pending_codes.get(email).map(|code| code.clone())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Transport(
                "simulated write failure".to_string(),
            ));
        }

        Ok(())
    }

    fn account_for_email(&self, email: &str) -> Account {
        let existing = self
            .emails
            .get(email)
            .map(|user_id| *user_id)
            .and_then(|user_id| self.accounts.get(&user_id).map(|account| account.clone()));

        if let Some(account) = existing {
            return account;
        }

        let account = Account {
            id: UserId::new(),
            email: email.to_string(),
        };

        self.emails.insert(email.to_string(), account.id);
        self.accounts.insert(account.id, account.clone());

        account
    }

    fn mint_session(&self, account: Account) -> Session {
        let session = Session {
            access_token: random_string(TOKEN_LENGTH),
            refresh_token: random_string(TOKEN_LENGTH),
            expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
            account,
        };

        self.refresh_tokens
            .insert(session.refresh_token.clone(), session.user_id());
        *self.active_session.lock() = Some(session.clone());

        session
    }

    fn sorted_pair(a: UserId, b: UserId) -> (UserId, UserId) {
        if a.0 <= b.0 {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Appends a message with a timestamp later than everything already in
    /// the room, so pagination order never ties
    fn append_message(&self, room_id: RoomId, sender_id: UserId, content: String) -> Message {
        let mut rows = self.messages.entry(room_id).or_default();

        let now = Utc::now();
        let created_at = rows
            .last()
            .map(|newest| (newest.created_at + Duration::milliseconds(1)).max(now))
            .unwrap_or(now);

        let message = Message {
            id: MessageId::assigned(),
            room_id,
            sender_id,
            content,
            created_at,
            is_read: false,
        };

        rows.push(message.clone());
        message
    }

    fn plays_matching_activity(&self, user_id: UserId, needle: &str) -> bool {
        let Some(rows) = self.user_activities.get(&user_id) else {
            return false;
        };

        rows.iter().any(|row| {
            self.catalog
                .get(&row.activity_id)
                .map(|activity| activity.name.to_lowercase().contains(needle))
                .unwrap_or(false)
        })
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Identity for MemoryBackend {
    async fn request_otp(&self, email: &str) -> Result<()> {
        let code = numeric_code(OTP_DIGITS);
        self.pending_codes.insert(email.to_string(), code);

        Ok(())
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session> {
        let stored = self.pending_codes.get(email).map(|code| code.clone());

        if stored.as_deref() != Some(code) {
            return Err(BackendError::Unauthorized(
                "invalid one-time code".to_string(),
            ));
        }

        self.pending_codes.remove(email);

        let account = self.account_for_email(email);
        Ok(self.mint_session(account))
    }

    async fn oauth_authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String> {
        // The in-memory provider signs in immediately, handing the callback
        // straight back with fresh credentials
        let account = self.account_for_email(&format!("{}@kickabout.app", provider.as_str()));

        let session = Session {
            access_token: random_string(TOKEN_LENGTH),
            refresh_token: random_string(TOKEN_LENGTH),
            expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
            account,
        };

        self.pending_oauth
            .insert(session.access_token.clone(), session.clone());

        Ok(format!(
            "{}#access_token={}&refresh_token={}",
            redirect_to, session.access_token, session.refresh_token
        ))
    }

    async fn exchange_oauth(&self, grant: OAuthGrant) -> Result<Session> {
        let token = match grant {
            OAuthGrant::Tokens { access_token, .. } => access_token,
            OAuthGrant::Code(code) => code,
        };

        let (_, session) = self.pending_oauth.remove(&token).ok_or_else(|| {
            BackendError::Unauthorized("unknown oauth credentials".to_string())
        })?;

        self.refresh_tokens
            .insert(session.refresh_token.clone(), session.user_id());
        *self.active_session.lock() = Some(session.clone());

        Ok(session)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let (_, user_id) = self.refresh_tokens.remove(refresh_token).ok_or_else(|| {
            BackendError::Unauthorized("invalid refresh token".to_string())
        })?;

        let account = self
            .accounts
            .get(&user_id)
            .map(|account| account.clone())
            .ok_or(BackendError::NotFound {
                resource: "account",
                identifier: user_id.to_string(),
            })?;

        Ok(self.mint_session(account))
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.active_session.lock().clone())
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let mut active = self.active_session.lock();

        if let Some(session) = active.as_ref() {
            if session.access_token == access_token {
                self.refresh_tokens.remove(&session.refresh_token);
                *active = None;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Records for MemoryBackend {
    async fn profile_by_id(&self, user_id: UserId) -> Result<Option<Profile>> {
        Ok(self.profiles.get(&user_id).map(|profile| profile.clone()))
    }

    async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile> {
        self.check_write()?;

        if self.profiles.contains_key(&new_profile.id) {
            return Err(BackendError::Conflict {
                resource: "profile",
                field: "id",
                value: new_profile.id.to_string(),
            });
        }

        let profile = Profile {
            id: new_profile.id,
            name: new_profile.name,
            gender: new_profile.gender,
            bio: new_profile.bio,
            city: new_profile.city,
            avatar_url: new_profile.avatar_url,
            location: new_profile.location,
            distance_radius_km: new_profile.distance_radius_km,
            competitive: new_profile.competitive,
            typical_play_times: new_profile.typical_play_times,
            hide_precise_distance: false,
            hide_last_active: false,
            private_profile: false,
            is_premium: false,
            created_at: Utc::now(),
        };

        self.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile> {
        self.check_write()?;

        let mut profile = self
            .profiles
            .get_mut(&update.id)
            .ok_or(BackendError::NotFound {
                resource: "profile",
                identifier: update.id.to_string(),
            })?;

        if let Some(name) = update.name {
            profile.name = name;
        }
        if let Some(bio) = update.bio {
            profile.bio = bio;
        }
        if let Some(city) = update.city {
            profile.city = city;
        }
        if let Some(avatar_url) = update.avatar_url {
            profile.avatar_url = avatar_url;
        }
        if let Some(location) = update.location {
            profile.location = Some(location);
        }
        if let Some(distance_radius_km) = update.distance_radius_km {
            profile.distance_radius_km = distance_radius_km;
        }
        if let Some(competitive) = update.competitive {
            profile.competitive = competitive;
        }
        if let Some(typical_play_times) = update.typical_play_times {
            profile.typical_play_times = typical_play_times;
        }
        if let Some(hide_precise_distance) = update.hide_precise_distance {
            profile.hide_precise_distance = hide_precise_distance;
        }
        if let Some(hide_last_active) = update.hide_last_active {
            profile.hide_last_active = hide_last_active;
        }
        if let Some(private_profile) = update.private_profile {
            profile.private_profile = private_profile;
        }

        Ok(profile.clone())
    }

    async fn browse_profiles(
        &self,
        filter: &DiscoveryFilter,
        page: PageRequest,
    ) -> Result<Vec<Profile>> {
        let mut rows: Vec<Profile> = self.profiles.iter().map(|profile| profile.clone()).collect();

        if let Some(gender) = filter.gender {
            rows.retain(|profile| profile.gender == gender);
        }

        if let Some(activity) = filter.activity.as_ref() {
            let needle = activity.to_lowercase();
            rows.retain(|profile| self.plays_matching_activity(profile.id, &needle));
        }

        if let (Some(near), Some(max_km)) = (filter.near, filter.max_distance_km) {
            rows.retain(|profile| {
                profile
                    .location
                    .map(|location| near.distance_km(&location) <= max_km as f64)
                    .unwrap_or(false)
            });
        }

        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });

        let start = page.offset().min(rows.len());
        let end = (page.offset() + page.per_page).min(rows.len());

        Ok(rows[start..end].to_vec())
    }

    async fn search_activities(&self, query: &str, page: PageRequest) -> Result<Vec<Activity>> {
        let needle = query.to_lowercase();

        let mut rows: Vec<Activity> = self
            .catalog
            .iter()
            .filter(|activity| needle.is_empty() || activity.name.to_lowercase().contains(&needle))
            .map(|activity| activity.clone())
            .collect();

        rows.sort_by(|a, b| a.name.cmp(&b.name));

        let start = page.offset().min(rows.len());
        let end = (page.offset() + page.per_page).min(rows.len());

        Ok(rows[start..end].to_vec())
    }

    async fn activities_for(&self, user_id: UserId) -> Result<Vec<UserActivity>> {
        Ok(self
            .user_activities
            .get(&user_id)
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }

    async fn replace_user_activities(
        &self,
        user_id: UserId,
        rows: Vec<UserActivity>,
    ) -> Result<()> {
        self.check_write()?;

        self.user_activities.insert(user_id, rows);
        Ok(())
    }

    async fn create_match_preferences(&self, preferences: MatchPreferences) -> Result<()> {
        self.check_write()?;

        if self.match_preferences.contains_key(&preferences.user_id) {
            return Err(BackendError::Conflict {
                resource: "match_preferences",
                field: "user_id",
                value: preferences.user_id.to_string(),
            });
        }

        self.match_preferences
            .insert(preferences.user_id, preferences);
        Ok(())
    }

    async fn messages_page(&self, room_id: RoomId, page: PageRequest) -> Result<Vec<Message>> {
        let Some(rows) = self.messages.get(&room_id) else {
            return Ok(Vec::new());
        };

        Ok(rows
            .iter()
            .rev()
            .skip(page.offset())
            .take(page.per_page)
            .cloned()
            .collect())
    }

    async fn insert_message(&self, new_message: NewMessage) -> Result<Message> {
        self.check_write()?;

        if !self.rooms.contains_key(&new_message.room_id) {
            return Err(BackendError::NotFound {
                resource: "room",
                identifier: new_message.room_id.to_string(),
            });
        }

        let message = self.append_message(
            new_message.room_id,
            new_message.sender_id,
            new_message.content,
        );

        self.registry.publish(MessageChange::Inserted {
            message: message.clone(),
        });

        Ok(message)
    }

    async fn mark_room_read(&self, room_id: RoomId, reader_id: UserId) -> Result<()> {
        let mut flipped = Vec::new();

        if let Some(mut rows) = self.messages.get_mut(&room_id) {
            for message in rows.iter_mut() {
                if message.sender_id != reader_id && !message.is_read {
                    message.is_read = true;
                    flipped.push(message.clone());
                }
            }
        }

        for message in flipped {
            self.registry.publish(MessageChange::Updated { message });
        }

        Ok(())
    }

    async fn my_rooms(&self, user_id: UserId) -> Result<Vec<RoomSummary>> {
        let mut summaries = Vec::new();

        for entry in self.rooms.iter() {
            let room_id = *entry.key();
            let (a, b) = *entry.value();

            let other = if a == user_id {
                b
            } else if b == user_id {
                a
            } else {
                continue;
            };

            let guard = self.messages.get(&room_id);
            let rows: &[Message] = guard.as_deref().map(Vec::as_slice).unwrap_or(&[]);

            let newest = rows.last();
            let unread = rows
                .iter()
                .filter(|message| message.sender_id != user_id && !message.is_read)
                .count() as u32;

            let profile = self.profiles.get(&other);

            summaries.push(RoomSummary {
                room_id,
                other_user_id: other,
                other_user_name: profile
                    .as_ref()
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| "Unknown player".to_string()),
                other_user_avatar: profile
                    .as_ref()
                    .map(|p| p.avatar_url.clone())
                    .unwrap_or_default(),
                last_message_content: newest.map(|message| message.content.clone()),
                last_message_at: newest.map(|message| message.created_at),
                unread_count: unread,
            });
        }

        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));

        Ok(summaries)
    }

    async fn room_for_pair(&self, a: UserId, b: UserId) -> Result<RoomId> {
        let pair = Self::sorted_pair(a, b);

        let room_id = *self.room_index.entry(pair).or_insert_with(RoomId::new);
        self.rooms.entry(room_id).or_insert(pair);

        Ok(room_id)
    }
}

#[async_trait]
impl ChangeFeed for MemoryBackend {
    async fn subscribe(&self, scope: FeedScope) -> Result<Subscription> {
        Ok(self.registry.subscribe(scope))
    }
}

#[async_trait]
impl FileStore for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        self.check_write()?;

        let key = format!("{}/{}", bucket, path);

        if !upsert && self.objects.contains_key(&key) {
            return Err(BackendError::Conflict {
                resource: "object",
                field: "path",
                value: key,
            });
        }

        self.objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );

        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use kickabout_core::{Gender, GeoPoint};

    async fn account(backend: &MemoryBackend, email: &str) -> Session {
        backend.request_otp(email).await.unwrap();
        let code = backend.issued_code(email).unwrap();

        backend.verify_otp(email, &code).await.unwrap()
    }

    fn new_profile(user_id: UserId, name: &str, gender: Gender, location: GeoPoint) -> NewProfile {
        NewProfile {
            id: user_id,
            name: name.to_string(),
            gender,
            bio: String::new(),
            city: "Berlin".to_string(),
            avatar_url: String::new(),
            location: Some(location),
            distance_radius_km: 25,
            competitive: false,
            typical_play_times: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_otp_codes_are_single_use() {
        let backend = MemoryBackend::new();

        backend.request_otp("someone@example.com").await.unwrap();
        let code = backend.issued_code("someone@example.com").unwrap();

        let wrong = backend.verify_otp("someone@example.com", "000000").await;
        assert!(
            matches!(wrong, Err(BackendError::Unauthorized(_))) || code == "000000",
            "a wrong code should be rejected"
        );

        let session = backend
            .verify_otp("someone@example.com", &code)
            .await
            .unwrap();
        assert_eq!(session.account.email, "someone@example.com");

        let reused = backend.verify_otp("someone@example.com", &code).await;
        assert!(reused.is_err(), "a code should only work once");
    }

    #[tokio::test]
    async fn test_same_address_keeps_its_account() {
        let backend = MemoryBackend::new();

        let first = account(&backend, "keeper@example.com").await;
        let second = account(&backend, "keeper@example.com").await;

        assert_eq!(first.user_id(), second.user_id());
    }

    #[tokio::test]
    async fn test_refresh_rotates_the_token() {
        let backend = MemoryBackend::new();
        let session = account(&backend, "someone@example.com").await;

        let refreshed = backend
            .refresh_session(&session.refresh_token)
            .await
            .unwrap();
        assert_eq!(refreshed.user_id(), session.user_id());
        assert_ne!(refreshed.refresh_token, session.refresh_token);

        let replayed = backend.refresh_session(&session.refresh_token).await;
        assert!(replayed.is_err(), "a used refresh token is dead");
    }

    #[tokio::test]
    async fn test_oauth_callback_round_trip() {
        let backend = MemoryBackend::new();

        let url = backend
            .oauth_authorize_url(OAuthProvider::Google, "kickabout://auth/callback")
            .await
            .unwrap();
        assert!(url.starts_with("kickabout://auth/callback#access_token="));

        let fragment = url.split_once('#').unwrap().1;
        let mut access_token = String::new();
        let mut refresh_token = String::new();

        for pair in fragment.split('&') {
            let (key, value) = pair.split_once('=').unwrap();
            match key {
                "access_token" => access_token = value.to_string(),
                "refresh_token" => refresh_token = value.to_string(),
                _ => {}
            }
        }

        let session = backend
            .exchange_oauth(OAuthGrant::Tokens {
                access_token,
                refresh_token,
            })
            .await
            .unwrap();
        assert_eq!(session.account.email, "google@kickabout.app");
    }

    #[tokio::test]
    async fn test_room_pairing_is_symmetric() {
        let backend = MemoryBackend::new();

        let a = UserId::new();
        let b = UserId::new();

        let forward = backend.room_for_pair(a, b).await.unwrap();
        let backward = backend.room_for_pair(b, a).await.unwrap();

        assert_eq!(forward, backward, "the pair maps to one room either way");

        let other = backend.room_for_pair(a, UserId::new()).await.unwrap();
        assert_ne!(forward, other);
    }

    #[tokio::test]
    async fn test_message_pages_are_newest_first() {
        let backend = MemoryBackend::new();

        let a = UserId::new();
        let b = UserId::new();
        let room_id = backend.room_for_pair(a, b).await.unwrap();

        for number in 0..25 {
            backend
                .insert_message(NewMessage {
                    room_id,
                    sender_id: a,
                    content: format!("kick {}", number),
                })
                .await
                .unwrap();
        }

        let first = backend
            .messages_page(room_id, PageRequest::messages(0))
            .await
            .unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(first[0].content, "kick 24");
        assert_eq!(first[19].content, "kick 5");

        let second = backend
            .messages_page(room_id, PageRequest::messages(1))
            .await
            .unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[4].content, "kick 0");

        let third = backend
            .messages_page(room_id, PageRequest::messages(2))
            .await
            .unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_unread_bookkeeping() {
        let backend = MemoryBackend::new();

        let sender = UserId::new();
        let reader = UserId::new();
        let room_id = backend.room_for_pair(sender, reader).await.unwrap();

        let mut feed = backend.subscribe(FeedScope::AllMessages).await.unwrap();

        for content in ["anyone free?", "pitch is booked"] {
            backend
                .insert_message(NewMessage {
                    room_id,
                    sender_id: sender,
                    content: content.to_string(),
                })
                .await
                .unwrap();
        }

        let rooms = backend.my_rooms(reader).await.unwrap();
        assert_eq!(rooms[0].unread_count, 2);
        assert_eq!(
            rooms[0].last_message_content.as_deref(),
            Some("pitch is booked")
        );

        backend.mark_room_read(room_id, reader).await.unwrap();

        let rooms = backend.my_rooms(reader).await.unwrap();
        assert_eq!(rooms[0].unread_count, 0);

        // Marking again publishes nothing new
        backend.mark_room_read(room_id, reader).await.unwrap();
        drop(backend);

        let mut inserts = 0;
        let mut updates = 0;

        while let Some(change) = feed.recv().await {
            match change {
                MessageChange::Inserted { .. } => inserts += 1,
                MessageChange::Updated { .. } => updates += 1,
                MessageChange::Deleted { .. } => {}
            }
        }

        assert_eq!(inserts, 2);
        assert_eq!(updates, 2, "only the first mark flips the rows");
    }

    #[tokio::test]
    async fn test_discovery_filters() {
        let backend = MemoryBackend::new();

        let berlin = GeoPoint {
            lat: 52.52,
            lng: 13.405,
        };
        let hamburg = GeoPoint {
            lat: 53.55,
            lng: 9.99,
        };

        let football = Activity {
            id: ActivityId::new(),
            name: "Football".to_string(),
        };
        backend.catalog.insert(football.id, football.clone());

        let near_player = UserId::new();
        let far_player = UserId::new();

        backend
            .create_profile(new_profile(near_player, "Jonas", Gender::Male, berlin))
            .await
            .unwrap();
        backend
            .create_profile(new_profile(far_player, "Mia", Gender::Female, hamburg))
            .await
            .unwrap();

        backend
            .replace_user_activities(
                near_player,
                vec![UserActivity {
                    user_id: near_player,
                    activity_id: football.id,
                    player_count: 10,
                }],
            )
            .await
            .unwrap();

        let page = PageRequest::new(0, 20);

        let all = backend
            .browse_profiles(&DiscoveryFilter::default(), page)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let women = backend
            .browse_profiles(
                &DiscoveryFilter {
                    gender: Some(Gender::Female),
                    ..Default::default()
                },
                page,
            )
            .await
            .unwrap();
        assert_eq!(women.len(), 1);
        assert_eq!(women[0].name, "Mia");

        let nearby = backend
            .browse_profiles(
                &DiscoveryFilter {
                    near: Some(berlin),
                    max_distance_km: Some(50),
                    ..Default::default()
                },
                page,
            )
            .await
            .unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].name, "Jonas");

        let footballers = backend
            .browse_profiles(
                &DiscoveryFilter {
                    activity: Some("foot".to_string()),
                    ..Default::default()
                },
                page,
            )
            .await
            .unwrap();
        assert_eq!(footballers.len(), 1);
        assert_eq!(footballers[0].name, "Jonas");
    }

    #[tokio::test]
    async fn test_simulated_failure_is_one_shot() {
        let backend = MemoryBackend::new();

        let a = UserId::new();
        let room_id = backend.room_for_pair(a, UserId::new()).await.unwrap();

        backend.fail_next_write();

        let failed = backend
            .insert_message(NewMessage {
                room_id,
                sender_id: a,
                content: "lost".to_string(),
            })
            .await;
        assert!(matches!(failed, Err(BackendError::Transport(_))));

        backend
            .insert_message(NewMessage {
                room_id,
                sender_id: a,
                content: "delivered".to_string(),
            })
            .await
            .expect("the failure should not stick");
    }

    #[tokio::test]
    async fn test_upload_respects_upsert() {
        let backend = MemoryBackend::new();

        backend
            .upload("avatars", "someone/avatar.jpg", vec![1], "image/jpeg", false)
            .await
            .unwrap();

        let conflict = backend
            .upload("avatars", "someone/avatar.jpg", vec![2], "image/jpeg", false)
            .await;
        assert!(matches!(conflict, Err(BackendError::Conflict { .. })));

        backend
            .upload("avatars", "someone/avatar.jpg", vec![2], "image/jpeg", true)
            .await
            .unwrap();

        let stored = backend.objects.get("avatars/someone/avatar.jpg").unwrap();
        assert_eq!(stored.bytes, vec![2]);
        assert_eq!(stored.content_type, "image/jpeg");

        assert_eq!(
            backend.public_url("avatars", "someone/avatar.jpg"),
            "memory://avatars/someone/avatar.jpg"
        );
    }

    #[tokio::test]
    async fn test_demo_town_is_ready_to_chat() {
        let backend = MemoryBackend::with_demo_data();

        let session = account(&backend, DEMO_EMAIL).await;

        let profile = backend.profile_by_id(session.user_id()).await.unwrap();
        assert!(profile.is_some(), "the demo account has a profile");

        let rooms = backend.my_rooms(session.user_id()).await.unwrap();
        assert!(!rooms.is_empty(), "the demo account has conversations");
        assert!(
            rooms.iter().any(|room| room.unread_count > 0),
            "something is waiting to be read"
        );

        let catalog = backend
            .search_activities("", PageRequest::activities(0))
            .await
            .unwrap();
        assert!(catalog.len() >= 5, "the catalog is stocked");
    }
}
