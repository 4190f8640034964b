//! Connection-side configuration: reconnects, subscriptions and the event stream.

use std::time::Duration;

use serde::Deserialize;

use crate::application::connection::ConnectionSettings;
use crate::domain::session::Endpoint;

/// `[reconnect]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Fixed delay before reconnecting; 0 disables automatic reconnects.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

const fn default_delay_secs() -> u64 {
    5
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
        }
    }
}

impl ReconnectConfig {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.delay_secs > 0
    }
}

/// `[subscription]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "default_publishing_interval_ms")]
    pub publishing_interval_ms: u64,
    /// Server-side notification buffer per point.
    #[serde(default = "default_queue_size")]
    pub queue_size: u32,
    /// Sampling interval for points that do not set their own.
    #[serde(default = "default_sampling_interval_ms")]
    pub default_sampling_interval_ms: u64,
}

const fn default_publishing_interval_ms() -> u64 {
    1000
}

const fn default_queue_size() -> u32 {
    10
}

const fn default_sampling_interval_ms() -> u64 {
    1000
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            publishing_interval_ms: default_publishing_interval_ms(),
            queue_size: default_queue_size(),
            default_sampling_interval_ms: default_sampling_interval_ms(),
        }
    }
}

impl SubscriptionConfig {
    #[must_use]
    pub const fn default_sampling(&self) -> Duration {
        Duration::from_millis(self.default_sampling_interval_ms)
    }
}

/// `[events]` section: the downstream event stream.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Events buffered before the oldest is dropped.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

const fn default_capacity() -> usize {
    1024
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Assemble manager settings from the connection sections.
#[must_use]
pub fn connection_settings(
    endpoint: &Endpoint,
    reconnect: &ReconnectConfig,
    subscription: &SubscriptionConfig,
) -> ConnectionSettings {
    ConnectionSettings {
        endpoint: endpoint.clone(),
        reconnect_delay: Duration::from_secs(reconnect.delay_secs),
        publishing_interval: Duration::from_millis(subscription.publishing_interval_ms),
        queue_size: subscription.queue_size,
    }
}
