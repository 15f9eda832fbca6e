//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Config file: `--config <FILE>`, else `$XDG_CONFIG_HOME/cloudland/cloudland.toml`
//! 3. Environment variables: `CLOUDLAND_*` prefix
//! 4. Command line flags (applied by the dispatcher)

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Duration;
use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Server-side session lifetime in seconds.
pub const DEFAULT_SESSION_LIFETIME_SECS: i64 = 1440;
/// Safety margin subtracted from the server lifetime when caching a session.
pub const DEFAULT_EXPIRY_MARGIN_SECS: i64 = 60;
/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "CLOUDLAND";

/// Unified configuration for the cloudland client.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the control panel API
    pub endpoint: Option<String>,
    pub username: Option<String>,
    /// Plaintext password or its SHA-1 hex digest
    pub password: Option<String>,
    /// Session cache file (default: `<tmp>/cloudland-session.json`)
    pub session_cache: PathBuf,
    pub session_lifetime_secs: i64,
    pub expiry_margin_secs: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            username: None,
            password: None,
            session_cache: default_session_cache(),
            session_lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
            expiry_margin_secs: DEFAULT_EXPIRY_MARGIN_SECS,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("session_cache", &self.session_cache)
            .field("session_lifetime_secs", &self.session_lifetime_secs)
            .field("expiry_margin_secs", &self.expiry_margin_secs)
            .finish()
    }
}

/// File layer: every field optional so unset keys inherit from the layer below.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
    session_cache: Option<PathBuf>,
    session_lifetime_secs: Option<i64>,
    expiry_margin_secs: Option<i64>,
}

fn default_session_cache() -> PathBuf {
    std::env::temp_dir().join("cloudland-session.json")
}

/// Get the XDG config directory for cloudland.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cloudland").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("cloudland.toml"))
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Longest a cached token may be presented: server lifetime minus margin.
    pub fn session_max_age(&self) -> Duration {
        Duration::seconds((self.session_lifetime_secs - self.expiry_margin_secs).max(0))
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the cache path.
    fn expand_paths(&mut self) -> Result<(), ApplicationError> {
        let raw = self.session_cache.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&raw).map_err(|e| ApplicationError::Config {
            message: format!("session_cache {}: {}", raw, e),
        })?;
        self.session_cache = PathBuf::from(expanded.as_ref());
        Ok(())
    }

    /// Overlay scalar options: a set file value wins, otherwise keep base.
    fn merge_with(&self, overlay: RawSettings) -> Self {
        Self {
            endpoint: overlay.endpoint.or_else(|| self.endpoint.clone()),
            username: overlay.username.or_else(|| self.username.clone()),
            password: overlay.password.or_else(|| self.password.clone()),
            session_cache: overlay
                .session_cache
                .unwrap_or_else(|| self.session_cache.clone()),
            session_lifetime_secs: overlay
                .session_lifetime_secs
                .unwrap_or(self.session_lifetime_secs),
            expiry_margin_secs: overlay
                .expiry_margin_secs
                .unwrap_or(self.expiry_margin_secs),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Explicit config file; must exist if given
    ///
    /// A missing global config file is not an error.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_with_env(config_file, env_source())
    }

    /// Load with an explicit environment source.
    pub fn load_with_env(
        config_file: Option<&Path>,
        env: Environment,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ApplicationError::Config {
                        message: format!("config file not found: {}", path.display()),
                    });
                }
                current = current.merge_with(load_raw_settings(path)?);
            }
            None => {
                if let Some(global_path) = global_config_path() {
                    if global_path.exists() {
                        current = current.merge_with(load_raw_settings(&global_path)?);
                    }
                }
            }
        }

        current = Self::apply_env_overrides(current, env)?;
        current.expand_paths()?;
        Ok(current)
    }

    /// Apply CLOUDLAND_* environment variables as explicit overrides.
    fn apply_env_overrides(
        mut settings: Self,
        env: Environment,
    ) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(env)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("endpoint") {
            settings.endpoint = Some(val);
        }
        if let Ok(val) = config.get_string("username") {
            settings.username = Some(val);
        }
        if let Ok(val) = config.get_string("password") {
            settings.password = Some(val);
        }
        if let Ok(val) = config.get_string("session_cache") {
            settings.session_cache = PathBuf::from(val);
        }
        // a malformed number is an error, not a silent fallback
        match config.get_int("session_lifetime_secs") {
            Ok(val) => settings.session_lifetime_secs = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }
        match config.get_int("expiry_margin_secs") {
            Ok(val) => settings.expiry_margin_secs = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }

        Ok(settings)
    }
}

/// Process environment: `CLOUDLAND_SESSION_CACHE` maps to `session_cache`.
pub fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_session_cache_in_temp_dir() {
        let settings = Settings::default();
        assert!(settings.session_cache.starts_with(std::env::temp_dir()));
        assert_eq!(settings.session_max_age(), Duration::seconds(1380));
        assert!(settings.endpoint.is_none());
    }

    #[test]
    fn given_password_when_debug_then_masked() {
        let settings = Settings {
            password: Some("hunter2".into()),
            ..Settings::default()
        };
        let shown = format!("{:?}", settings);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("***"));
    }

    #[test]
    fn given_margin_above_lifetime_when_max_age_then_zero() {
        let settings = Settings {
            session_lifetime_secs: 30,
            expiry_margin_secs: 60,
            ..Settings::default()
        };
        assert_eq!(settings.session_max_age(), Duration::zero());
    }

    #[test]
    fn given_tilde_in_cache_path_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            session_cache: PathBuf::from("~/.cache/cl.json"),
            ..Settings::default()
        };

        settings.expand_paths().unwrap();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.session_cache.starts_with(&home));
    }
}
