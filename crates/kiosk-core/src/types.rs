//! Common types used across the Kiosk service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a client session.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a session id from its string form.
    ///
    /// Returns `None` if the string is not a valid UUID.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A server-held per-client session record.
///
/// Sessions are ephemeral: they live in process memory and are destroyed on
/// explicit logout or restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session last saw a request.
    pub last_seen: DateTime<Utc>,
    /// Number of requests handled under this session.
    pub requests: u64,
}

impl Session {
    /// Creates a fresh session with a random id.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            created_at: now,
            last_seen: now,
            requests: 0,
        }
    }

    /// Records a request against this session.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
        self.requests += 1;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// A submitted contact form.
///
/// Wire field names are kept for compatibility with existing clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSubmission {
    /// Sender name.
    #[serde(rename = "nome")]
    pub name: String,
    /// Sender e-mail address.
    pub email: String,
    /// Message body.
    #[serde(rename = "mensagem")]
    pub message: String,
}
