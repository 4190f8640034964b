//! Monitored points and their configuration.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::coerce::DeclaredType;
use super::id::{PointId, Topic};
use super::value::{PointValue, Sample};

/// One entry of the `[[points]]` configuration list.
#[derive(Debug, Clone, Deserialize)]
pub struct PointConfig {
    /// External-facing key; defaults to the point id.
    #[serde(default)]
    pub topic: Option<String>,
    /// Protocol-specific identifier.
    pub point_id: String,
    #[serde(default)]
    pub declared_type: DeclaredType,
    /// Sampling interval override for this point.
    #[serde(default)]
    pub sampling_interval_ms: Option<u64>,
}

impl PointConfig {
    pub fn new(point_id: impl Into<String>) -> Self {
        Self {
            topic: None,
            point_id: point_id.into(),
            declared_type: DeclaredType::Auto,
            sampling_interval_ms: None,
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub const fn with_type(mut self, declared_type: DeclaredType) -> Self {
        self.declared_type = declared_type;
        self
    }

    #[must_use]
    pub const fn with_sampling_interval_ms(mut self, ms: u64) -> Self {
        self.sampling_interval_ms = Some(ms);
        self
    }

    /// Topic the point is published under once defaults are applied.
    #[must_use]
    pub fn effective_topic(&self) -> Topic {
        match self.topic.as_deref().map(str::trim) {
            Some(topic) if !topic.is_empty() => Topic::new(topic),
            _ => Topic::new(self.point_id.as_str()),
        }
    }
}

/// A point the manager subscribes to, with its last delivered value.
///
/// Identity (topic, point id, type, sampling interval) never changes after
/// construction; only the last value and its time are updated.
#[derive(Debug, Clone)]
pub struct MonitoredPoint {
    topic: Topic,
    point_id: PointId,
    declared_type: DeclaredType,
    sampling_interval: Duration,
    last_value: Option<PointValue>,
    last_update_time: Option<DateTime<Utc>>,
}

impl MonitoredPoint {
    pub fn new(
        topic: Topic,
        point_id: PointId,
        declared_type: DeclaredType,
        sampling_interval: Duration,
    ) -> Self {
        Self {
            topic,
            point_id,
            declared_type,
            sampling_interval,
            last_value: None,
            last_update_time: None,
        }
    }

    /// Build from configuration, using `default_sampling` when the entry has none.
    pub fn from_config(config: &PointConfig, default_sampling: Duration) -> Self {
        let sampling = config
            .sampling_interval_ms
            .map_or(default_sampling, Duration::from_millis);
        Self::new(
            config.effective_topic(),
            PointId::new(config.point_id.trim()),
            config.declared_type,
            sampling,
        )
    }

    /// An unregistered point addressed directly by its identifier.
    pub fn ad_hoc(point_id: PointId, default_sampling: Duration) -> Self {
        Self::new(
            Topic::new(point_id.as_str()),
            point_id,
            DeclaredType::Auto,
            default_sampling,
        )
    }

    #[must_use]
    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub const fn point_id(&self) -> &PointId {
        &self.point_id
    }

    #[must_use]
    pub const fn declared_type(&self) -> DeclaredType {
        self.declared_type
    }

    #[must_use]
    pub const fn sampling_interval(&self) -> Duration {
        self.sampling_interval
    }

    #[must_use]
    pub const fn last_value(&self) -> Option<&PointValue> {
        self.last_value.as_ref()
    }

    #[must_use]
    pub const fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }

    /// Record a delivered sample.
    ///
    /// Returns false, leaving the point untouched, when the sample is older
    /// than the one already recorded.
    pub fn record(&mut self, sample: &Sample) -> bool {
        if let Some(last) = self.last_update_time {
            if sample.timestamp < last {
                return false;
            }
        }
        self.last_value = Some(sample.value.clone());
        self.last_update_time = Some(sample.timestamp);
        true
    }
}
