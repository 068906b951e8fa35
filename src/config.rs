//! Configuration for d1kit sessions.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables:
//!
//! ```toml
//! backend = "remote"
//!
//! [remote]
//! account_id = "..."
//! api_token = "..."
//!
//! [local]
//! root = "/var/lib/d1kit"
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `D1KIT_BACKEND` | `backend` |
//! | `CLOUDFLARE_ACCOUNT_ID` | `remote.account_id` |
//! | `CLOUDFLARE_API_TOKEN` | `remote.api_token` |
//! | `CLOUDFLARE_API_BASE_URL` | `remote.base_url` |
//! | `D1KIT_LOCAL_ROOT` | `local.root` |

use crate::error::{Error, Result};
use crate::paths;
use crate::session::Backend;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Defaults
// =============================================================================

/// Base URL of the Cloudflare v4 API.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
/// Overall deadline for one HTTP exchange.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// How long a local statement waits on a locked database file.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// Config Types
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub remote: RemoteConfig,
    pub local: LocalConfig,
}

/// Settings for the D1 REST API.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub account_id: String,
    pub api_token: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            api_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl RemoteConfig {
    /// Remote settings with default endpoint and timeouts.
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Checks credentials and endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the account id or token is empty, or the
    /// base URL is not an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() || self.api_token.trim().is_empty() {
            return Err(Error::config("invalid account ID and/or API token"));
        }

        let url = url::Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("invalid base_url '{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "base_url must use http or https (got: '{}')",
                url.scheme()
            )));
        }
        Ok(())
    }
}

/// Settings for the local SQLite emulator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory holding one file per database. Defaults to
    /// [`paths::get_databases_dir`].
    pub root: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl LocalConfig {
    /// Local settings rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Configured root, or the default databases directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the root is empty or no home directory
    /// can be determined.
    pub fn resolve_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) if root.as_os_str().is_empty() => {
                Err(Error::config("local root path cannot be empty"))
            }
            Some(root) => Ok(root.clone()),
            None => paths::get_databases_dir(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl Config {
    /// Loads configuration from a TOML file, then applies the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::io(format!("reading config file {}", path.display()), e)
        })?;

        let mut config = Self::parse(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        config.apply_env()?;
        Ok(config)
    }

    /// Loads the default config file if it exists, otherwise defaults, then
    /// applies the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = paths::get_config_path()?;
        if path.exists() {
            return Self::load_from(path);
        }
        Self::from_env()
    }

    /// Defaults overridden by the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `D1KIT_BACKEND` names an unknown backend.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Parses TOML without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid TOML or mistyped fields.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Overrides fields from the environment variables listed in the module
    /// docs. Unset or empty variables leave the field unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `D1KIT_BACKEND` names an unknown backend.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(backend) = env_var("D1KIT_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(account_id) = env_var("CLOUDFLARE_ACCOUNT_ID") {
            self.remote.account_id = account_id;
        }
        if let Some(api_token) = env_var("CLOUDFLARE_API_TOKEN") {
            self.remote.api_token = api_token;
        }
        if let Some(base_url) = env_var("CLOUDFLARE_API_BASE_URL") {
            self.remote.base_url = base_url;
        }
        if let Some(root) = env_var("D1KIT_LOCAL_ROOT") {
            self.local.root = Some(PathBuf::from(root));
        }
        Ok(())
    }

    /// Validates the settings of the selected backend only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            Backend::Remote => self.remote.validate(),
            Backend::Local => self.local.resolve_root().map(|_| ()),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
