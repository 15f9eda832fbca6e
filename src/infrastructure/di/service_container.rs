//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{CloudlandClient, SessionService, SessionStore};
use crate::config::Settings;
use crate::domain::Session;
use crate::infrastructure::traits::{FileSystem, HttpBackend, RealFileSystem, ReqwestBackend};
use crate::infrastructure::InfraResult;

/// Container holding the I/O implementations and settings services are built from.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// HTTP abstraction
    pub http: Arc<dyn HttpBackend>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        Ok(Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(ReqwestBackend::new()?),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        http: Arc<dyn HttpBackend>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs, http }
    }

    pub fn session_service(&self) -> SessionService {
        let store = SessionStore::new(self.fs.clone(), &self.settings);
        SessionService::new(store, self.http.clone())
    }

    /// Client presenting `session` to `endpoint`.
    pub fn client(&self, endpoint: &str, session: Session) -> CloudlandClient {
        CloudlandClient::new(endpoint, self.http.clone(), session)
    }
}
