use std::path::Path;

use log::warn;

use kickabout_core::{
    ActivityId, BackendError, Gender, GeoPoint, MatchPreferences, NewProfile, Profile,
    ProfileUpdate, UserActivity, UserId,
};

use crate::ClientContext;

/// The bucket profile photos are uploaded to
pub const AVATAR_BUCKET: &str = "avatars";

/// Reads and writes profiles, including the full onboarding submission
pub struct ProfileService {
    context: ClientContext,
}

/// Everything collected by the setup wizard, ready to be stored
#[derive(Debug, Clone)]
pub struct SetupSubmission {
    pub name: String,
    pub gender: Gender,
    pub bio: String,
    pub city: String,
    pub avatar: AvatarSource,
    pub location: Option<GeoPoint>,
    pub distance_radius_km: u32,
    pub activities: Vec<ActivitySelection>,
    pub prefers_male: bool,
    pub prefers_female: bool,
    pub prefers_nonbinary: bool,
}

/// Where the profile photo comes from
#[derive(Debug, Clone)]
pub enum AvatarSource {
    /// A picture on disk that still needs to be uploaded
    File(String),
    /// An already hosted picture, kept as is
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySelection {
    pub activity_id: ActivityId,
    pub player_count: u32,
}

impl ProfileService {
    pub fn new(context: &ClientContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Returns a profile if one exists
    pub async fn get(&self, user_id: UserId) -> Result<Option<Profile>, BackendError> {
        self.context.backend.profile_by_id(user_id).await
    }

    /// Returns the signed in user's profile, refreshing the local copy
    pub async fn my_profile(&self) -> Result<Option<Profile>, BackendError> {
        let user_id = self.context.require_user()?;
        let profile = self.context.backend.profile_by_id(user_id).await?;

        if let Some(profile) = profile.clone() {
            self.context.set_profile(profile);
        }

        Ok(profile)
    }

    /// Stores a full onboarding submission.
    ///
    /// The photo upload and the profile row must succeed. Preferences and
    /// activity rows are written afterwards, and a failure there leaves a
    /// usable profile behind, so it is logged rather than rolled back.
    pub async fn create(&self, submission: SetupSubmission) -> Result<Profile, BackendError> {
        let user_id = self.context.require_user()?;
        let avatar_url = self.resolve_avatar(user_id, &submission.avatar).await?;

        let profile = self
            .context
            .backend
            .create_profile(NewProfile {
                id: user_id,
                name: submission.name,
                gender: submission.gender,
                bio: submission.bio,
                city: submission.city,
                avatar_url,
                location: submission.location,
                distance_radius_km: submission.distance_radius_km,
                competitive: false,
                typical_play_times: Vec::new(),
            })
            .await?;

        let preferences = MatchPreferences {
            user_id,
            prefers_male: submission.prefers_male,
            prefers_female: submission.prefers_female,
            prefers_nonbinary: submission.prefers_nonbinary,
        };

        if let Err(e) = self
            .context
            .backend
            .create_match_preferences(preferences)
            .await
        {
            warn!("Profile was created but preferences were not: {}", e);
        }

        let rows = submission
            .activities
            .into_iter()
            .map(|selection| UserActivity {
                user_id,
                activity_id: selection.activity_id,
                player_count: selection.player_count,
            })
            .collect();

        if let Err(e) = self
            .context
            .backend
            .replace_user_activities(user_id, rows)
            .await
        {
            warn!("Profile was created but activities were not: {}", e);
        }

        self.context.set_profile(profile.clone());
        Ok(profile)
    }

    /// Returns the activities listed on a profile
    pub async fn activities(&self, user_id: UserId) -> Result<Vec<UserActivity>, BackendError> {
        self.context.backend.activities_for(user_id).await
    }

    /// Writes a partial profile update
    pub async fn update(&self, update: ProfileUpdate) -> Result<Profile, BackendError> {
        let profile = self.context.backend.update_profile(update).await?;
        self.context.set_profile(profile.clone());

        Ok(profile)
    }

    /// Replaces the signed in user's activities, as done by profile editing
    pub async fn set_activities(
        &self,
        selections: Vec<ActivitySelection>,
    ) -> Result<(), BackendError> {
        let user_id = self.context.require_user()?;

        let rows = selections
            .into_iter()
            .map(|selection| UserActivity {
                user_id,
                activity_id: selection.activity_id,
                player_count: selection.player_count,
            })
            .collect();

        self.context
            .backend
            .replace_user_activities(user_id, rows)
            .await
    }

    /// Uploads a local photo, or keeps an already hosted one
    async fn resolve_avatar(
        &self,
        user_id: UserId,
        avatar: &AvatarSource,
    ) -> Result<String, BackendError> {
        let path = match avatar {
            AvatarSource::Url(url) => return Ok(url.clone()),
            AvatarSource::File(path) => path,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(BackendError::internal)?;

        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_lowercase();

        let object_path = format!("{}/avatar.{}", user_id, extension);

        self.context
            .backend
            .upload(
                AVATAR_BUCKET,
                &object_path,
                bytes,
                content_type_for(&extension),
                true,
            )
            .await?;

        Ok(self.context.backend.public_url(AVATAR_BUCKET, &object_path))
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}
