//! Session cache and login
//!
//! A successful login yields a token set that is cached in a file and reused by
//! later invocations until it expires or the server stops accepting it. Any problem
//! with the cache (missing, corrupt, expired, rejected) falls back to a fresh login.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument, warn};

use crate::application::services::Transport;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{is_not_authenticated, Credentials, FieldMap, Request, Session, Verb};
use crate::infrastructure::traits::{FileSystem, HttpBackend};

/// Read-only call used to check that a cached session is still live.
pub const PROBE_ACTION: &str = "get_vm_list";

/// Value of the `op` field of the login call.
pub const LOGIN_OP: &str = "login";

/// File-backed cache holding at most one session.
pub struct SessionStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(fs: Arc<dyn FileSystem>, settings: &Settings) -> Self {
        Self {
            fs,
            path: settings.session_cache.clone(),
            max_age: settings.session_max_age(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Longest a saved token may stay valid.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Load the cached session, if there is a usable one.
    pub fn load(&self) -> Option<Session> {
        self.load_at(Utc::now())
    }

    /// Load as of `now`. Absent, unreadable, corrupt and expired caches all yield `None`.
    pub fn load_at(&self, now: DateTime<Utc>) -> Option<Session> {
        if !self.fs.exists(&self.path) {
            debug!("no session cache at {}", self.path.display());
            return None;
        }
        let content = match self.fs.read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!("cannot read session cache {}: {}", self.path.display(), e);
                return None;
            }
        };
        let session: Session = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    "ignoring corrupt session cache {}: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };
        if session.tokens.is_empty() {
            debug!("cached session holds no tokens");
            return None;
        }
        if session.is_expired(now) {
            debug!("cached session expired");
            return None;
        }
        Some(session)
    }

    /// Persist `session`, capping each token expiry at `max_age` from now.
    ///
    /// Returns the session as stored.
    pub fn save(&self, session: Session) -> ApplicationResult<Session> {
        self.save_at(session, Utc::now())
    }

    pub fn save_at(&self, session: Session, now: DateTime<Utc>) -> ApplicationResult<Session> {
        let session = session.clamped(self.max_age, now);
        let json = serde_json::to_string_pretty(&session).map_err(|e| {
            ApplicationError::OperationFailed {
                context: "serialize session".to_string(),
                source: Box::new(e),
            }
        })?;
        self.fs
            .ensure_parent(&self.path)
            .map_err(|e| ApplicationError::io("create session cache directory", &self.path, e))?;
        self.fs
            .replace(&self.path, &json)
            .map_err(|e| ApplicationError::io("write session cache", &self.path, e))?;
        debug!("session cached at {}", self.path.display());
        Ok(session)
    }

    /// Remove the cache file; a missing file is fine.
    pub fn discard(&self) {
        if !self.fs.exists(&self.path) {
            return;
        }
        if let Err(e) = self.fs.remove_file(&self.path) {
            warn!("cannot remove session cache {}: {}", self.path.display(), e);
        }
    }
}

/// Obtains a live session: the cached one if the server still accepts it,
/// otherwise a fresh login.
pub struct SessionService {
    store: SessionStore,
    backend: Arc<dyn HttpBackend>,
}

impl SessionService {
    pub fn new(store: SessionStore, backend: Arc<dyn HttpBackend>) -> Self {
        Self { store, backend }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Probe the server with `session`. Network errors count as invalid.
    #[instrument(skip_all)]
    pub fn validate(&self, session: &Session) -> bool {
        let transport = Transport::authenticated(
            session.endpoint.clone(),
            self.backend.clone(),
            session.clone(),
        );
        match transport.send(&Request::read(PROBE_ACTION)) {
            Ok(body) => {
                let live = !is_not_authenticated(&body);
                debug!(live, "session probe answered");
                live
            }
            Err(e) => {
                warn!("session probe failed: {}", e);
                false
            }
        }
    }

    /// Return a live session for `credentials` at `endpoint`.
    ///
    /// Reuses a cached session that belongs to the same endpoint and user and passes
    /// the probe. Otherwise logs in with the digest of the secret and caches the result.
    ///
    /// # Errors
    /// - [`ApplicationError::AuthFailure`] if the server refuses the login or issues no token
    /// - [`ApplicationError::Transport`] if the login call cannot be made
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub fn login(&self, endpoint: &str, credentials: &Credentials) -> ApplicationResult<Session> {
        if let Some(cached) = self.store.load() {
            if !cached.belongs_to(endpoint, &credentials.username) {
                debug!("cached session belongs to another endpoint or user");
            } else if self.validate(&cached) {
                debug!("reusing cached session");
                return Ok(cached);
            } else {
                debug!("cached session no longer accepted");
            }
        }

        let mut fields = FieldMap::new();
        fields.insert("username", credentials.username.as_str());
        fields.insert("sha1", credentials.digest());
        fields.insert("op", LOGIN_OP);

        let reply = Transport::anonymous(endpoint, self.backend.clone())
            .exchange(Verb::Mutate, &fields)?;

        if is_not_authenticated(&reply.body) || reply.tokens.is_empty() {
            self.store.discard();
            return Err(ApplicationError::AuthFailure {
                username: credentials.username.clone(),
            });
        }

        let now = Utc::now();
        let session = Session::new(endpoint, credentials.username.as_str(), reply.tokens, now);
        match self.store.save_at(session.clone(), now) {
            Ok(saved) => Ok(saved),
            Err(e) => {
                warn!("session not cached: {}", e);
                Ok(session.clamped(self.store.max_age(), now))
            }
        }
    }
}
