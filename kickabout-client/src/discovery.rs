use kickabout_core::{BackendError, DiscoveryFilter, PageRequest, Profile};

use crate::ClientContext;

/// How many profiles are fetched per page of the discover surface
const PROFILES_PER_PAGE: usize = 20;

/// Finds people to play with
pub struct DiscoveryService {
    context: ClientContext,
}

impl DiscoveryService {
    pub fn new(context: &ClientContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Returns one page of profiles matching the filter.
    ///
    /// The viewer's own profile and private profiles are never shown.
    /// When the filter has no reference point, distances are measured from
    /// the viewer's own location.
    pub async fn browse(
        &self,
        filter: &DiscoveryFilter,
        page: usize,
    ) -> Result<Vec<Profile>, BackendError> {
        let viewer = self.context.require_user()?;

        let mut filter = filter.clone();
        if filter.near.is_none() {
            filter.near = self.context.current_profile().and_then(|p| p.location);
        }

        let profiles = self
            .context
            .backend
            .browse_profiles(&filter, PageRequest::new(page, PROFILES_PER_PAGE))
            .await?;

        Ok(profiles
            .into_iter()
            .filter(|profile| profile.id != viewer && !profile.private_profile)
            .collect())
    }
}
