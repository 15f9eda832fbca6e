//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io::{self, Write};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::COOKIE;
use thiserror::Error;

use crate::domain::{FieldMap, Token};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace file content so readers see either the old or the new content.
    fn replace(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Raw HTTP exchange result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code
    pub status: u16,
    /// Response body text
    pub body: String,
    /// Cookies set by the response
    pub tokens: Vec<Token>,
}

impl HttpReply {
    /// 200 reply with `body` and no cookies.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            tokens: Vec::new(),
        }
    }

    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }
}

/// Network-level failure: connection refused, DNS, TLS, broken body.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct BackendError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

/// HTTP abstraction: one blocking request per call, no retries.
pub trait HttpBackend: Send + Sync {
    /// GET `url` with `params` as query string, presenting `tokens` as cookies.
    fn get(&self, url: &str, params: &FieldMap, tokens: &[Token])
        -> Result<HttpReply, BackendError>;

    /// POST `fields` form-encoded to `url`, presenting `tokens` as cookies.
    fn post(&self, url: &str, fields: &FieldMap, tokens: &[Token])
        -> Result<HttpReply, BackendError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn replace(&self, path: &Path, content: &str) -> io::Result<()> {
        // Temp file in the target directory so the final rename stays on one device.
        // tempfile creates it owner-readable only.
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Real HTTP implementation using blocking reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    /// Build a client with the library's default connect/read behavior.
    pub fn new() -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(concat!("cloudland/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn send(&self, request: RequestBuilder, tokens: &[Token]) -> Result<HttpReply, BackendError> {
        let request = if tokens.is_empty() {
            request
        } else {
            let cookie = tokens
                .iter()
                .map(Token::cookie_pair)
                .collect::<Vec<_>>()
                .join("; ");
            request.header(COOKIE, cookie)
        };

        let response = request.send()?;
        let status = response.status().as_u16();
        let now = Utc::now();
        let tokens = response
            .cookies()
            .map(|c| {
                let token = Token::new(c.name(), c.value());
                match cookie_expiry(c.max_age(), c.expires(), now) {
                    Some(at) => token.with_expiry(at),
                    None => token,
                }
            })
            .collect();
        let body = response.text()?;

        Ok(HttpReply {
            status,
            body,
            tokens,
        })
    }
}

/// Max-Age wins over Expires, as in RFC 6265.
fn cookie_expiry(
    max_age: Option<std::time::Duration>,
    expires: Option<SystemTime>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if let Some(age) = max_age {
        return chrono::Duration::from_std(age).ok().map(|d| now + d);
    }
    expires.map(DateTime::<Utc>::from)
}

impl HttpBackend for ReqwestBackend {
    fn get(
        &self,
        url: &str,
        params: &FieldMap,
        tokens: &[Token],
    ) -> Result<HttpReply, BackendError> {
        self.send(self.client.get(url).query(params.as_pairs()), tokens)
    }

    fn post(
        &self,
        url: &str,
        fields: &FieldMap,
        tokens: &[Token],
    ) -> Result<HttpReply, BackendError> {
        self.send(self.client.post(url).form(fields.as_pairs()), tokens)
    }
}
