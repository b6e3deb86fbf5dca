use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Identifies a signed in user, and by extension their profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

/// Identifies a chat room between two users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub Uuid);

/// Identifies an activity in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub Uuid);

/// Identifies a chat message.
///
/// A message only gets a proper id once the backend has stored it. Before
/// that happens, an optimistically shown message carries a [MessageId::Local]
/// derived from the moment it was composed, so the rest of the system can
/// always tell an echo apart from a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Assigned by the backend when the message was stored.
    Assigned(Uuid),
    /// A placeholder for a message that is still being sent, in epoch milliseconds.
    Local(i64),
}

#[derive(Debug, Error)]
#[error("malformed id: {0}")]
pub struct InvalidId(String);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl ActivityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl MessageId {
    /// Creates an id for a message stored by the backend.
    pub fn assigned() -> Self {
        Self::Assigned(Uuid::new_v4())
    }

    /// Creates a placeholder id for an optimistic echo.
    pub fn local_now() -> Self {
        Self::Local(Utc::now().timestamp_millis())
    }

    /// Returns true if this message has not been stored by the backend yet.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assigned(id) => Display::fmt(id, f),
            Self::Local(millis) => write!(f, "local-{}", millis),
        }
    }
}

impl FromStr for MessageId {
    type Err = InvalidId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(millis) = value.strip_prefix("local-") {
            let millis = millis.parse().map_err(|_| InvalidId(value.to_string()))?;
            return Ok(Self::Local(millis));
        }

        Uuid::parse_str(value)
            .map(Self::Assigned)
            .map_err(|_| InvalidId(value.to_string()))
    }
}

impl Serialize for MessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_message_id_round_trip() {
        let assigned = MessageId::assigned();
        let parsed: MessageId = assigned.to_string().parse().unwrap();
        assert_eq!(parsed, assigned, "assigned ids should round trip");

        let local = MessageId::Local(1_700_000_000_000);
        let parsed: MessageId = local.to_string().parse().unwrap();
        assert_eq!(parsed, local, "local ids should round trip");

        assert!(local.is_local());
        assert!(!assigned.is_local());
    }

    #[test]
    fn test_message_id_rejects_garbage() {
        assert!("not-an-id".parse::<MessageId>().is_err());
        assert!("local-xyz".parse::<MessageId>().is_err());
    }
}
