mod sse;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures_util::StreamExt;
use log::warn;
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::spawn;
use tokio::sync::mpsc::unbounded_channel;

use kickabout_core::{
    Account, Activity, BackendError, ChangeFeed, DiscoveryFilter, FeedScope, FileStore, Identity,
    MatchPreferences, Message, MessageChange, NewMessage, NewProfile, OAuthGrant, OAuthProvider,
    PageRequest, Profile, ProfileUpdate, Records, Result, RoomId, RoomSummary, Session,
    Subscription, UserActivity, UserId,
};

use sse::SseParser;

/// Where and how to reach the hosted backend
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL without a trailing slash, like `https://api.kickabout.app`
    pub base_url: String,
    /// The publishable key sent with every request
    pub api_key: String,
}

/// The hosted backend, spoken to over HTTP.
///
/// Records go through the relational API, identity through the auth service,
/// live changes arrive on a server sent event stream, and uploads go to the
/// object store. All four share one connection pool and session.
pub struct RestBackend {
    config: RestConfig,
    http: Client,
    /// The session used to authorize requests, mirrored from sign in
    session: Mutex<Option<Session>>,
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Self {
        let config = RestConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        };

        Self {
            config,
            http: Client::new(),
            session: Default::default(),
        }
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, endpoint)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.config.base_url, function)
    }

    /// Attaches the key and the bearer token. Before sign in the key doubles
    /// as the bearer, which is how anonymous requests are made.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .lock()
            .as_ref()
            .map(|session| session.access_token.clone())
            .unwrap_or_else(|| self.config.api_key.clone());

        request
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", token))
    }

    fn store_session(&self, session: Session) -> Session {
        *self.session.lock() = Some(session.clone());
        session
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))
    }

    /// Maps an error status on a record or storage request to the shared
    /// taxonomy
    async fn error_for(resource: &'static str, response: Response) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                BackendError::Unauthorized(reason(&body))
            }
            StatusCode::NOT_FOUND => BackendError::NotFound {
                resource,
                identifier: reason(&body),
            },
            StatusCode::CONFLICT => BackendError::Conflict {
                resource,
                field: "key",
                value: reason(&body),
            },
            _ => BackendError::Transport(format!("{} ({})", reason(&body), status)),
        }
    }

    /// The identity service reports bad credentials with several statuses,
    /// all of which mean the caller is not signed in
    async fn auth_error(response: Response) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::UNPROCESSABLE_ENTITY => BackendError::Unauthorized(reason(&body)),
            _ => BackendError::Transport(format!("{} ({})", reason(&body), status)),
        }
    }

    async fn read_json<T>(resource: &'static str, response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            return Err(Self::error_for(resource, response).await);
        }

        response.json().await.map_err(|err| BackendError::Decode {
            resource,
            reason: err.to_string(),
        })
    }

    async fn read_ok(resource: &'static str, response: Response) -> Result<()> {
        if !response.status().is_success() {
            return Err(Self::error_for(resource, response).await);
        }

        Ok(())
    }

    async fn read_auth_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }

        response.json().await.map_err(|err| BackendError::Decode {
            resource: "session",
            reason: err.to_string(),
        })
    }

    async fn read_auth_ok(response: Response) -> Result<()> {
        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }

        Ok(())
    }

    /// Returns the first row of a representation, which insert and update
    /// requests ask the relational API to echo back
    fn first_row<T>(resource: &'static str, mut rows: Vec<T>) -> Result<T> {
        if rows.is_empty() {
            return Err(BackendError::Decode {
                resource,
                reason: "empty representation".to_string(),
            });
        }

        Ok(rows.remove(0))
    }
}

fn reason(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

    parsed
        .as_ref()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        })
        .map(|text| text.to_string())
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// A session as the identity service returns it
#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: UserId,
    email: String,
}

impl WireSession {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            account: Account {
                id: self.user.id,
                email: self.user.email,
            },
        }
    }
}

#[async_trait]
impl Identity for RestBackend {
    async fn request_otp(&self, email: &str) -> Result<()> {
        let request = self.http.post(self.auth_url("otp")).json(&json!({
            "email": email,
            "create_user": true,
        }));

        let response = self.send(request).await?;
        Self::read_auth_ok(response).await
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session> {
        let request = self.http.post(self.auth_url("verify")).json(&json!({
            "type": "email",
            "email": email,
            "token": code,
        }));

        let response = self.send(request).await?;
        let wire: WireSession = Self::read_auth_json(response).await?;

        Ok(self.store_session(wire.into_session()))
    }

    async fn oauth_authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String> {
        let mut url = Url::parse(&self.auth_url("authorize")).map_err(BackendError::internal)?;

        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);

        Ok(url.to_string())
    }

    async fn exchange_oauth(&self, grant: OAuthGrant) -> Result<Session> {
        match grant {
            // A finished token pair just needs to be rotated into a session
            // this backend has vouched for
            OAuthGrant::Tokens { refresh_token, .. } => self.refresh_session(&refresh_token).await,
            OAuthGrant::Code(code) => {
                let request = self
                    .http
                    .post(format!("{}?grant_type=pkce", self.auth_url("token")))
                    .json(&json!({ "auth_code": code }));

                let response = self.send(request).await?;
                let wire: WireSession = Self::read_auth_json(response).await?;

                Ok(self.store_session(wire.into_session()))
            }
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let request = self
            .http
            .post(format!(
                "{}?grant_type=refresh_token",
                self.auth_url("token")
            ))
            .json(&json!({ "refresh_token": refresh_token }));

        let response = self.send(request).await?;
        let wire: WireSession = Self::read_auth_json(response).await?;

        Ok(self.store_session(wire.into_session()))
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().clone())
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let request = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", access_token));

        let result = request.send().await;

        // The local session is gone regardless of what the server said
        *self.session.lock() = None;

        let response = result.map_err(|err| BackendError::Transport(err.to_string()))?;
        Self::read_auth_ok(response).await
    }
}

#[async_trait]
impl Records for RestBackend {
    async fn profile_by_id(&self, user_id: UserId) -> Result<Option<Profile>> {
        let request = self.http.get(self.table_url("profiles")).query(&[
            ("id", format!("eq.{}", user_id)),
            ("limit", "1".to_string()),
        ]);

        let response = self.send(request).await?;
        let rows: Vec<Profile> = Self::read_json("profile", response).await?;

        Ok(rows.into_iter().next())
    }

    async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile> {
        let request = self
            .http
            .post(self.table_url("profiles"))
            .header("Prefer", "return=representation")
            .json(&new_profile);

        let response = self.send(request).await?;
        let rows: Vec<Profile> = Self::read_json("profile", response).await?;

        Self::first_row("profile", rows)
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile> {
        let request = self
            .http
            .patch(self.table_url("profiles"))
            .query(&[("id", format!("eq.{}", update.id))])
            .header("Prefer", "return=representation")
            .json(&update);

        let response = self.send(request).await?;
        let rows: Vec<Profile> = Self::read_json("profile", response).await?;

        Self::first_row("profile", rows)
    }

    async fn browse_profiles(
        &self,
        filter: &DiscoveryFilter,
        page: PageRequest,
    ) -> Result<Vec<Profile>> {
        let (start, end) = page.range();

        let request = self
            .http
            .post(self.rpc_url("discover_profiles"))
            .header("Range", format!("{}-{}", start, end))
            .json(filter);

        let response = self.send(request).await?;
        Self::read_json("profile", response).await
    }

    async fn search_activities(&self, query: &str, page: PageRequest) -> Result<Vec<Activity>> {
        let (start, end) = page.range();

        let mut params = vec![("order", "name.asc".to_string())];

        if !query.is_empty() {
            params.push(("name", format!("ilike.*{}*", query)));
        }

        let request = self
            .http
            .get(self.table_url("activities"))
            .query(&params)
            .header("Range", format!("{}-{}", start, end));

        let response = self.send(request).await?;
        Self::read_json("activity", response).await
    }

    async fn activities_for(&self, user_id: UserId) -> Result<Vec<UserActivity>> {
        let request = self
            .http
            .get(self.table_url("user_activities"))
            .query(&[("user_id", format!("eq.{}", user_id))]);

        let response = self.send(request).await?;
        Self::read_json("user_activity", response).await
    }

    async fn replace_user_activities(
        &self,
        user_id: UserId,
        rows: Vec<UserActivity>,
    ) -> Result<()> {
        let request = self
            .http
            .delete(self.table_url("user_activities"))
            .query(&[("user_id", format!("eq.{}", user_id))]);

        let response = self.send(request).await?;
        Self::read_ok("user_activity", response).await?;

        if rows.is_empty() {
            return Ok(());
        }

        let request = self
            .http
            .post(self.table_url("user_activities"))
            .header("Prefer", "return=minimal")
            .json(&rows);

        let response = self.send(request).await?;
        Self::read_ok("user_activity", response).await
    }

    async fn create_match_preferences(&self, preferences: MatchPreferences) -> Result<()> {
        let request = self
            .http
            .post(self.table_url("match_preferences"))
            .header("Prefer", "return=minimal")
            .json(&preferences);

        let response = self.send(request).await?;
        Self::read_ok("match_preferences", response).await
    }

    async fn messages_page(&self, room_id: RoomId, page: PageRequest) -> Result<Vec<Message>> {
        let (start, end) = page.range();

        let request = self
            .http
            .get(self.table_url("messages"))
            .query(&[
                ("room_id", format!("eq.{}", room_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .header("Range", format!("{}-{}", start, end));

        let response = self.send(request).await?;
        Self::read_json("message", response).await
    }

    async fn insert_message(&self, new_message: NewMessage) -> Result<Message> {
        let request = self
            .http
            .post(self.table_url("messages"))
            .header("Prefer", "return=representation")
            .json(&new_message);

        let response = self.send(request).await?;
        let rows: Vec<Message> = Self::read_json("message", response).await?;

        Self::first_row("message", rows)
    }

    async fn mark_room_read(&self, room_id: RoomId, reader_id: UserId) -> Result<()> {
        let request = self
            .http
            .patch(self.table_url("messages"))
            .query(&[
                ("room_id", format!("eq.{}", room_id)),
                ("sender_id", format!("neq.{}", reader_id)),
                ("is_read", "eq.false".to_string()),
            ])
            .header("Prefer", "return=minimal")
            .json(&json!({ "is_read": true }));

        let response = self.send(request).await?;
        Self::read_ok("message", response).await
    }

    async fn my_rooms(&self, user_id: UserId) -> Result<Vec<RoomSummary>> {
        let request = self
            .http
            .post(self.rpc_url("my_rooms"))
            .json(&json!({ "user_id": user_id }));

        let response = self.send(request).await?;
        Self::read_json("room", response).await
    }

    async fn room_for_pair(&self, a: UserId, b: UserId) -> Result<RoomId> {
        let request = self
            .http
            .post(self.rpc_url("room_for_pair"))
            .json(&json!({ "a": a, "b": b }));

        let response = self.send(request).await?;
        Self::read_json("room", response).await
    }
}

#[async_trait]
impl ChangeFeed for RestBackend {
    async fn subscribe(&self, scope: FeedScope) -> Result<Subscription> {
        let scope_param = match scope {
            FeedScope::Room(room_id) => format!("room:{}", room_id),
            FeedScope::AllMessages => "messages".to_string(),
        };

        let request = self
            .http
            .get(format!("{}/realtime/v1/changes", self.config.base_url))
            .query(&[("scope", scope_param.as_str())])
            .header("Accept", "text/event-stream");

        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(Self::error_for("changes", response).await);
        }

        let (sender, receiver) = unbounded_channel();

        let reader = spawn(async move {
            let mut stream = response.bytes_stream();
            let mut parser = SseParser::new();

            while let Some(chunk) = stream.next().await {
                let Ok(chunk) = chunk else { break };

                for data in parser.push(&chunk) {
                    match serde_json::from_str::<MessageChange>(&data) {
                        Ok(change) => {
                            if sender.send(change).is_err() {
                                return;
                            }
                        }
                        Err(err) => warn!("Ignoring malformed change event: {}", err),
                    }
                }
            }
        });

        // Aborting the reader closes the connection, which is the release
        Ok(Subscription::new(receiver, move || reader.abort()))
    }
}

#[async_trait]
impl FileStore for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url, bucket, path
        );

        let request = self
            .http
            .post(url)
            .header("Content-Type", content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);

        let response = self.send(request).await?;
        Self::read_ok("object", response).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url, bucket, path
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn backend() -> RestBackend {
        RestBackend::new(RestConfig {
            base_url: "https://api.kickabout.app/".to_string(),
            api_key: "public-key".to_string(),
        })
    }

    #[test]
    fn test_base_url_is_normalized() {
        let backend = backend();

        assert_eq!(
            backend.table_url("profiles"),
            "https://api.kickabout.app/rest/v1/profiles"
        );
        assert_eq!(
            backend.public_url("avatars", "someone/avatar.jpg"),
            "https://api.kickabout.app/storage/v1/object/public/avatars/someone/avatar.jpg"
        );
    }

    #[tokio::test]
    async fn test_authorize_url_carries_provider_and_redirect() {
        let backend = backend();

        let url = backend
            .oauth_authorize_url(OAuthProvider::Google, "kickabout://auth/callback")
            .await
            .unwrap();

        assert!(url.starts_with("https://api.kickabout.app/auth/v1/authorize?"));
        assert!(url.contains("provider=google"));
        assert!(url.contains("redirect_to=kickabout%3A%2F%2Fauth%2Fcallback"));
    }

    #[test]
    fn test_reason_prefers_the_service_message() {
        assert_eq!(reason(r#"{"message":"duplicate key"}"#), "duplicate key");
        assert_eq!(reason(r#"{"msg":"Token expired"}"#), "Token expired");
        assert_eq!(
            reason(r#"{"error":"denied","error_description":"user denied"}"#),
            "user denied"
        );
        assert_eq!(reason("plain text"), "plain text");
    }
}
