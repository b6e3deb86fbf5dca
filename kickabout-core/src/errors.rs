use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors produced by any of the backend collaborators.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An unknown or internal error happened in the backend
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A record already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The record collection in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A record doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    /// The session is missing, expired, or otherwise rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// A record came back in a shape the client doesn't understand.
    /// This is always a bug on one side of the wire and should never be ignored.
    #[error("failed to decode {resource}: {reason}")]
    Decode {
        resource: &'static str,
        reason: String,
    },
    /// The backend could not be reached, or the request failed in transit
    #[error("request failed: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(Box::new(error))
    }

    /// Returns true if the error means the current session is no longer usable.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Returns true if retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
