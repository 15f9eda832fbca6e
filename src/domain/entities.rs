//! Domain entities: credentials and the reusable login session

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::secret::normalize_secret;

/// Username and secret used to log in.
///
/// The secret is either a plaintext password or its SHA-1 hex digest.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Secret in the digest form expected by the login call.
    pub fn digest(&self) -> String {
        normalize_secret(&self.secret)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

/// One authentication cookie issued by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub value: String,
    /// Expiry as announced by the server, if any. Clamped when the session is saved.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// A token without an expiry never reports itself expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// `name=value` pair as sent in a `Cookie` header.
    pub fn cookie_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Authenticated session: the token set returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub endpoint: String,
    pub username: String,
    pub tokens: Vec<Token>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        tokens: Vec<Token>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            tokens,
            created_at,
        }
    }

    /// A single expired token invalidates the whole session.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.tokens.iter().any(|t| t.is_expired(now))
    }

    /// Whether this session was issued for `username` at `endpoint`.
    pub fn belongs_to(&self, endpoint: &str, username: &str) -> bool {
        self.endpoint == endpoint && self.username == username
    }

    /// Cap every token expiry at `now + max_age`.
    ///
    /// Tokens without a server expiry get exactly `now + max_age`.
    pub fn clamped(mut self, max_age: Duration, now: DateTime<Utc>) -> Self {
        let limit = now + max_age;
        for token in &mut self.tokens {
            token.expires_at = Some(match token.expires_at {
                Some(at) if at < limit => at,
                _ => limit,
            });
        }
        self
    }

    /// Value of the `Cookie` header carrying all tokens.
    pub fn cookie_header(&self) -> String {
        self.tokens
            .iter()
            .map(Token::cookie_pair)
            .collect::<Vec<_>>()
            .join("; ")
    }
}
