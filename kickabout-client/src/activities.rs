use kickabout_core::{Activity, BackendError, PageRequest};

use crate::ClientContext;

/// Searches the activity catalog
pub struct ActivityService {
    context: ClientContext,
}

impl ActivityService {
    pub fn new(context: &ClientContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Returns one page of activities matching the query.
    /// An empty query lists the whole catalog.
    pub async fn search(&self, query: &str, page: usize) -> Result<Vec<Activity>, BackendError> {
        self.context
            .backend
            .search_activities(query.trim(), PageRequest::activities(page))
            .await
    }
}
