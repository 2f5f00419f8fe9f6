//! Session records and the identity they carry.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes behind every session identifier.
const SESSION_ID_BYTES: usize = 32;

/// Identity claims returned by the provider's user-info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Stable subject identifier (`sub`).
    #[serde(rename = "sub", default)]
    pub subject: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub preferred_username: String,
}

/// A server-held session bound to a cookie value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque identifier presented by the client in the session cookie.
    pub session_id: String,

    /// Identity fetched from the provider at login.
    pub user_info: UserInfo,

    /// Access token returned by the token endpoint.
    pub access_token: String,

    /// Instant after which the session is no longer valid.
    pub expires_at: DateTime<Utc>,

    /// The `state` value the callback completed with.
    pub state: String,
}

impl SessionRecord {
    /// Check whether the record has expired at `now`.
    ///
    /// A record is valid only while `expires_at` is strictly after `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Check whether the record has expired at the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Short, log-safe prefix of the session id.
    pub fn short_id(&self) -> &str {
        short_id(&self.session_id)
    }
}

/// Generate a fresh, unguessable session identifier.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
