//! `[auth]` section: the login service and token timing.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::application::token::TokenSettings;
use crate::error::{ConfigError, Result};

/// Environment variable overriding `auth.username`.
pub const USERNAME_ENV: &str = "FLOWLINK_AUTH_USERNAME";
/// Environment variable overriding `auth.password`.
pub const PASSWORD_ENV: &str = "FLOWLINK_AUTH_PASSWORD";

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default)]
    pub host: String,
    /// Scheme default when unset.
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Background poll interval; 0 disables the poll.
    #[serde(default)]
    pub poll_interval_secs: u64,
    #[serde(default = "default_skew_secs")]
    pub skew_secs: u64,
    #[serde(default = "default_lifetime_secs")]
    pub default_lifetime_secs: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_scheme() -> String {
    "http".into()
}

fn default_path() -> String {
    "/login".into()
}

const fn default_skew_secs() -> u64 {
    60
}

const fn default_lifetime_secs() -> u64 {
    30 * 60
}

const fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: String::new(),
            port: None,
            path: default_path(),
            username: None,
            password: None,
            poll_interval_secs: 0,
            skew_secs: default_skew_secs(),
            default_lifetime_secs: default_lifetime_secs(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("skew_secs", &self.skew_secs)
            .field("default_lifetime_secs", &self.default_lifetime_secs)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty()
    }

    /// Apply credential overrides from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(username) = std::env::var(USERNAME_ENV) {
            self.username = Some(username);
        }
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            self.password = Some(password);
        }
    }

    /// Login endpoint without credentials.
    ///
    /// # Errors
    ///
    /// Fails when scheme, host, port and path do not form a valid URL.
    pub fn base_url(&self) -> Result<Url> {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        let authority = match self.port {
            Some(port) => format!("{}:{port}", self.host.trim()),
            None => self.host.trim().to_string(),
        };
        Ok(Url::parse(&format!("{}://{authority}{path}", self.scheme))?)
    }

    /// Login URL with percent-encoded `username` and `password` parameters.
    ///
    /// # Errors
    ///
    /// As for [`base_url`](Self::base_url).
    pub fn login_url(&self) -> Result<Url> {
        let mut url = self.base_url()?;
        url.query_pairs_mut()
            .append_pair("username", self.username.as_deref().unwrap_or_default())
            .append_pair("password", self.password.as_deref().unwrap_or_default());
        Ok(url)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            skew: chrono::Duration::seconds(i64::try_from(self.skew_secs).unwrap_or(i64::MAX)),
            default_lifetime: chrono::Duration::seconds(
                i64::try_from(self.default_lifetime_secs).unwrap_or(i64::MAX),
            ),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "auth.scheme",
                reason: format!("expected http or https, got '{}'", self.scheme),
            }
            .into());
        }
        if self.default_lifetime_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "auth.default_lifetime_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.is_configured() {
            self.base_url().map_err(|e| ConfigError::InvalidValue {
                field: "auth.host",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
