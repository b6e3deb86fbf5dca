use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActivityId, GeoPoint, MessageId, RoomId, UserId};

/// A kickabout profile, created once during onboarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the account that owns the profile
    pub id: UserId,
    pub name: String,
    pub gender: Gender,
    pub bio: String,
    pub city: String,
    pub avatar_url: String,
    pub location: Option<GeoPoint>,
    /// How far away the user wants to find people, in kilometers
    pub distance_radius_km: u32,
    /// Whether the user prefers competitive play over casual games
    pub competitive: bool,
    pub typical_play_times: Vec<String>,
    pub hide_precise_distance: bool,
    pub hide_last_active: bool,
    pub private_profile: bool,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Payload for creating a profile. Privacy flags start out disabled.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: UserId,
    pub name: String,
    pub gender: Gender,
    pub bio: String,
    pub city: String,
    pub avatar_url: String,
    pub location: Option<GeoPoint>,
    pub distance_radius_km: u32,
    pub competitive: bool,
    pub typical_play_times: Vec<String>,
}

/// Payload for a partial profile update. Only the `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing)]
    pub id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_radius_km: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_play_times: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_precise_distance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_last_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_profile: Option<bool>,
}

impl ProfileUpdate {
    pub fn for_user(id: UserId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// An activity from the shared catalog, such as football or padel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
}

/// Links a profile to an activity it plays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_id: UserId,
    pub activity_id: ActivityId,
    /// The group size the user usually plays this activity with
    pub player_count: u32,
}

/// Which genders a profile wants to be matched with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPreferences {
    pub user_id: UserId,
    pub prefers_male: bool,
    pub prefers_female: bool,
    pub prefers_nonbinary: bool,
}

/// A chat message between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Set once the recipient has opened the room
    pub is_read: bool,
}

/// Payload for sending a message
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
}

/// One row of the chat room overview, aggregated by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub other_user_id: UserId,
    pub other_user_name: String,
    pub other_user_avatar: String,
    pub last_message_content: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Messages from the other user that the viewer has not read yet
    pub unread_count: u32,
}

/// Criteria for browsing profiles on the discover surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryFilter {
    /// Keep only profiles playing an activity whose name contains this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// Where distances are measured from, usually the viewer's location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<u32>,
}

/// An account known to the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub email: String,
}

/// A signed in session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub account: Account,
}

impl Session {
    pub fn user_id(&self) -> UserId {
        self.account.id
    }
}

/// External identity providers supported for sign in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

/// The credentials extracted from an OAuth callback.
/// Providers either hand back a finished token pair or a one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthGrant {
    Tokens {
        access_token: String,
        refresh_token: String,
    },
    Code(String),
}
