use std::time::{Duration, Instant};

use chrono::Utc;
use log::warn;
use parking_lot::Mutex;
use thiserror::Error;
use url::Url;

use kickabout_core::{BackendError, OAuthGrant, OAuthProvider, Profile, Session};

use crate::ClientContext;

/// Handles sign in, sign out, and session restoration
pub struct SessionManager {
    context: ClientContext,
    /// When the last one-time code was requested, for the resend cooldown
    last_code_request: Mutex<Option<Instant>>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Enter a valid email address")]
    InvalidEmail,
    #[error("The code must be {} digits", SessionManager::OTP_LENGTH)]
    MalformedCode,
    /// The code was wrong, expired, or already used
    #[error("Invalid or expired code")]
    InvalidCode,
    #[error("Wait {remaining_secs} seconds before requesting another code")]
    ResendCooldown { remaining_secs: u64 },
    #[error("The sign in link is malformed: {0}")]
    MalformedCallback(String),
    /// The provider refused the sign in, usually because the user cancelled
    #[error("Sign in was refused: {0}")]
    ProviderDenied(String),
    /// Something else went wrong in the backend
    #[error(transparent)]
    Backend(BackendError),
}

/// The result of a completed sign in
#[derive(Debug, Clone)]
pub struct SignIn {
    pub session: Session,
    /// True when the account has no profile yet and must go through setup
    pub needs_onboarding: bool,
}

impl SessionManager {
    pub const OTP_LENGTH: usize = 6;
    const RESEND_COOLDOWN: Duration = Duration::from_secs(60);
    /// Sessions about to expire within this window are refreshed on restore
    const REFRESH_MARGIN_SECS: i64 = 60;
    const OAUTH_REDIRECT: &'static str = "kickabout://auth/callback";

    pub fn new(context: &ClientContext) -> Self {
        Self {
            context: context.clone(),
            last_code_request: Default::default(),
        }
    }

    /// Restores the session this device is signed in with, if any.
    /// Called once at launch, before any screen is shown.
    pub async fn restore(&self) -> Result<Option<SignIn>, AuthError> {
        let session = match self.context.backend.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(None),
            Err(e) if e.is_unauthorized() => return Ok(None),
            Err(e) => return Err(AuthError::Backend(e)),
        };

        let expires_in = session.expires_at - Utc::now();
        let session = if expires_in.num_seconds() < Self::REFRESH_MARGIN_SECS {
            match self
                .context
                .backend
                .refresh_session(&session.refresh_token)
                .await
            {
                Ok(refreshed) => refreshed,
                Err(e) => {
                    warn!("Could not refresh the stored session: {}", e);
                    return Ok(None);
                }
            }
        } else {
            session
        };

        self.finish_sign_in(session).await.map(Some)
    }

    /// Requests a one-time sign in code, creating the account on first use
    pub async fn request_code(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email)?;

        if let Some(remaining) = self.resend_available_in() {
            return Err(AuthError::ResendCooldown {
                remaining_secs: remaining.as_secs().max(1),
            });
        }

        self.context
            .backend
            .request_otp(&email)
            .await
            .map_err(AuthError::Backend)?;

        *self.last_code_request.lock() = Some(Instant::now());
        Ok(())
    }

    /// How long until another code may be requested, if a cooldown is running
    pub fn resend_available_in(&self) -> Option<Duration> {
        let last = (*self.last_code_request.lock())?;
        Self::RESEND_COOLDOWN.checked_sub(last.elapsed())
    }

    /// Exchanges a one-time code for a session
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<SignIn, AuthError> {
        let email = normalize_email(email)?;
        let code = code.trim();

        if code.len() != Self::OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::MalformedCode);
        }

        let session = self
            .context
            .backend
            .verify_otp(&email, code)
            .await
            .map_err(|e| match e {
                BackendError::Unauthorized(_) => AuthError::InvalidCode,
                BackendError::NotFound { .. } => AuthError::InvalidCode,
                err => AuthError::Backend(err),
            })?;

        self.finish_sign_in(session).await
    }

    /// Returns the URL to open in a browser for an external sign in
    pub async fn oauth_begin(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        self.context
            .backend
            .oauth_authorize_url(provider, Self::OAUTH_REDIRECT)
            .await
            .map_err(AuthError::Backend)
    }

    /// Finishes an external sign in with the callback URL the provider
    /// redirected to
    pub async fn oauth_complete(&self, callback_url: &str) -> Result<SignIn, AuthError> {
        let grant = parse_oauth_callback(callback_url)?;

        let session = self
            .context
            .backend
            .exchange_oauth(grant)
            .await
            .map_err(AuthError::Backend)?;

        self.finish_sign_in(session).await
    }

    /// Signs out of the backend and clears local state.
    /// A failed backend call still signs out locally.
    pub async fn sign_out(&self) {
        if let Some(session) = self.context.current_session() {
            if let Err(e) = self.context.backend.sign_out(&session.access_token).await {
                warn!("Backend sign out failed: {}", e);
            }
        }

        self.context.set_session(None);
    }

    pub fn current_session(&self) -> Option<Session> {
        self.context.current_session()
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.context.current_profile()
    }

    /// Stores the session and loads the profile to decide where to route
    async fn finish_sign_in(&self, session: Session) -> Result<SignIn, AuthError> {
        let user_id = session.user_id();
        self.context.set_session(Some(session.clone()));

        let profile = self
            .context
            .backend
            .profile_by_id(user_id)
            .await
            .map_err(AuthError::Backend)?;

        let needs_onboarding = profile.is_none();
        if let Some(profile) = profile {
            self.context.set_profile(profile);
        }

        Ok(SignIn {
            session,
            needs_onboarding,
        })
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();

    let (local, domain) = email.split_once('@').ok_or(AuthError::InvalidEmail)?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AuthError::InvalidEmail);
    }

    Ok(email)
}

/// Extracts the credentials from an OAuth callback URL.
/// Providers put them in the query, the fragment, or both.
fn parse_oauth_callback(callback_url: &str) -> Result<OAuthGrant, AuthError> {
    let url =
        Url::parse(callback_url).map_err(|e| AuthError::MalformedCallback(e.to_string()))?;

    let mut params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if let Some(fragment) = url.fragment() {
        params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
    }

    let param = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    if let Some(error) = param("error") {
        let description = param("error_description").unwrap_or(error);
        return Err(AuthError::ProviderDenied(description));
    }

    if let (Some(access_token), Some(refresh_token)) =
        (param("access_token"), param("refresh_token"))
    {
        return Ok(OAuthGrant::Tokens {
            access_token,
            refresh_token,
        });
    }

    if let Some(code) = param("code") {
        return Ok(OAuthGrant::Code(code));
    }

    Err(AuthError::MalformedCallback(
        "no credentials in callback".to_string(),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_email_normalization() {
        assert_eq!(
            normalize_email("  Sam@Example.COM ").unwrap(),
            "sam@example.com"
        );

        assert!(normalize_email("sam").is_err());
        assert!(normalize_email("sam@").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("sam@example").is_err());
    }

    #[test]
    fn test_callback_with_token_fragment() {
        let grant = parse_oauth_callback(
            "kickabout://auth/callback#access_token=abc&refresh_token=def&token_type=bearer",
        )
        .unwrap();

        assert_eq!(
            grant,
            OAuthGrant::Tokens {
                access_token: "abc".to_string(),
                refresh_token: "def".to_string(),
            }
        );
    }

    #[test]
    fn test_callback_with_code_query() {
        let grant = parse_oauth_callback("kickabout://auth/callback?code=xyz").unwrap();
        assert_eq!(grant, OAuthGrant::Code("xyz".to_string()));
    }

    #[test]
    fn test_callback_with_provider_error() {
        let result = parse_oauth_callback(
            "kickabout://auth/callback?error=access_denied&error_description=User+cancelled",
        );

        assert!(matches!(
            result,
            Err(AuthError::ProviderDenied(reason)) if reason == "User cancelled"
        ));
    }

    #[test]
    fn test_callback_without_credentials() {
        assert!(matches!(
            parse_oauth_callback("kickabout://auth/callback?state=123"),
            Err(AuthError::MalformedCallback(_))
        ));
        assert!(matches!(
            parse_oauth_callback("not a url"),
            Err(AuthError::MalformedCallback(_))
        ));
    }
}
