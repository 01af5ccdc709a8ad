//! Configuration for ~/.config/instafeed/config.toml and the environment.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Environment variables override file values, so a deployment can run from
//! the environment alone. Unknown keys are accepted but logged as warnings.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::remote::Credentials;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Environment Variables
// ============================================================================

/// Pre-authenticated session cookie (bypasses login).
pub const ENV_COOKIE: &str = "COOKIE";
/// Direct RSS export location (bypasses discovery).
pub const ENV_EXPORT_URL: &str = "RSS_FEED";
pub const ENV_USERNAME: &str = "INSTAPAPER_USERNAME";
pub const ENV_PASSWORD: &str = "INSTAPAPER_PASSWORD";
pub const ENV_BASE_URL: &str = "INSTAFEED_BASE_URL";

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// `cookie` and `password` are masked by the custom `Debug` impl.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URL of the reading-list service.
    pub base_url: String,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Pre-authenticated `Cookie` header value. Takes precedence over login.
    pub cookie: Option<String>,

    /// Account username (email), used only when no cookie is supplied.
    pub username: Option<String>,

    /// Account password. May be omitted for password-less accounts.
    pub password: Option<String>,

    /// RSS export location. When unset it is discovered from the list page.
    pub export_url: Option<String>,

    /// Title of the generated channel.
    pub channel_title: String,

    /// Link of the generated channel.
    pub channel_link: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.instapaper.com".to_string(),
            user_agent: format!("instafeed/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            cookie: None,
            username: None,
            password: None,
            export_url: None,
            channel_title: "Instapaper: Unread".to_string(),
            channel_link: "https://www.instapaper.com/u".to_string(),
        }
    }
}

/// Mask credentials in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("cookie", &self.cookie.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("export_url", &self.export_url)
            .field("channel_title", &self.channel_title)
            .field("channel_link", &self.channel_link)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "base_url",
        "user_agent",
        "timeout_secs",
        "cookie",
        "username",
        "password",
        "export_url",
        "channel_title",
        "channel_link",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    /// Override values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override values from a variable lookup. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(cookie) = get(ENV_COOKIE) {
            self.cookie = Some(cookie);
        }
        if let Some(export_url) = get(ENV_EXPORT_URL) {
            self.export_url = Some(export_url);
        }
        if let Some(username) = get(ENV_USERNAME) {
            self.username = Some(username);
        }
        if let Some(password) = get(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if let Some(base_url) = get(ENV_BASE_URL) {
            self.base_url = base_url;
        }
    }

    /// Check values that would otherwise fail deep inside a generation cycle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".into()));
        }
        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid(format!(
                    "base_url must be http(s), got scheme '{}'",
                    url.scheme()
                )))
            }
            Err(e) => return Err(ConfigError::Invalid(format!("base_url: {e}"))),
        }
        if let Some(export_url) = &self.export_url {
            url::Url::parse(export_url)
                .map_err(|e| ConfigError::Invalid(format!("export_url: {e}")))?;
        }
        Ok(())
    }

    /// Where the session comes from, by precedence.
    pub fn credentials(&self) -> Credentials {
        Credentials::from_parts(
            self.cookie.as_deref(),
            self.username.as_deref(),
            self.password.as_deref(),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
