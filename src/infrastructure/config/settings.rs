//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; login credentials may be
//! overridden from the environment (`FLOWLINK_AUTH_USERNAME`,
//! `FLOWLINK_AUTH_PASSWORD`).
//!
//! # Example
//!
//! ```no_run
//! use flowlink::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("flowlink.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::auth::AuthConfig;
use super::connection::{connection_settings, EventsConfig, ReconnectConfig, SubscriptionConfig};
use super::logging::LoggingConfig;
use crate::application::connection::ConnectionSettings;
use crate::domain::point::PointConfig;
use crate::domain::session::Endpoint;
use crate::error::{ConfigError, Result};

/// Main configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`]. Every section is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote point source to connect to.
    #[serde(default)]
    pub endpoint: Endpoint,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub subscription: SubscriptionConfig,

    #[serde(default)]
    pub events: EventsConfig,

    /// Login service; leave `host` empty to run without a token cache.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Monitored points, in registration order.
    #[serde(default)]
    pub points: Vec<PointConfig>,
}

impl Config {
    /// Parse configuration from TOML content, apply environment overrides
    /// and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed (including unknown declared
    /// types) or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.auth.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or as for
    /// [`parse_toml`](Self::parse_toml).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if !self.points.is_empty() && self.endpoint.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "endpoint.url",
            }
            .into());
        }

        let mut topics = HashSet::with_capacity(self.points.len());
        for point in &self.points {
            if point.point_id.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "points.point_id",
                }
                .into());
            }
            if point.sampling_interval_ms == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "points.sampling_interval_ms",
                    reason: format!("must be greater than 0 for '{}'", point.point_id),
                }
                .into());
            }
            let topic = point.effective_topic();
            if !topics.insert(topic.clone()) {
                return Err(ConfigError::DuplicateTopic {
                    topic: topic.to_string(),
                }
                .into());
            }
        }

        if self.subscription.queue_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "subscription.queue_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.subscription.publishing_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "subscription.publishing_interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "events.capacity",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        self.auth.validate()
    }

    /// Initialize logging from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    #[must_use]
    pub fn connection_settings(&self) -> ConnectionSettings {
        connection_settings(&self.endpoint, &self.reconnect, &self.subscription)
    }
}
