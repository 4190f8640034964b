//! Subscription registry and notification delivery.
//!
//! Holds the configured points in registration order, resolves request keys
//! to points, and turns value-change notifications into state-store writes
//! and downstream events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::application::queue::Publisher;
use crate::domain::event::PointEvent;
use crate::domain::id::{PointId, Topic};
use crate::domain::point::{MonitoredPoint, PointConfig};
use crate::domain::request::Request;
use crate::domain::value::Sample;
use crate::error::{ConfigError, Error, Result};
use crate::port::{NotificationSink, StateWriter};

/// Generation value meaning "no link is accepting notifications".
const NO_GENERATION: u64 = 0;

/// The set of monitored points and the delivery path for their values.
pub struct SubscriptionRegistry {
    points: RwLock<Vec<MonitoredPoint>>,
    by_topic: HashMap<Topic, usize>,
    /// First registered topic for each point id.
    by_point: HashMap<PointId, usize>,
    default_sampling: Duration,
    state: StateWriter,
    events: Publisher<PointEvent>,
    accepting: AtomicU64,
}

impl SubscriptionRegistry {
    /// Build the registry from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateTopic`] if two points share a topic.
    pub fn new(
        configs: &[PointConfig],
        default_sampling: Duration,
        state: StateWriter,
        events: Publisher<PointEvent>,
    ) -> Result<Self> {
        let mut points = Vec::with_capacity(configs.len());
        let mut by_topic = HashMap::with_capacity(configs.len());
        let mut by_point = HashMap::with_capacity(configs.len());

        for config in configs {
            let point = MonitoredPoint::from_config(config, default_sampling);
            let index = points.len();
            if by_topic.insert(point.topic().clone(), index).is_some() {
                return Err(ConfigError::DuplicateTopic {
                    topic: point.topic().to_string(),
                }
                .into());
            }
            if by_point.contains_key(point.point_id()) {
                warn!(
                    point_id = %point.point_id(),
                    topic = %point.topic(),
                    "Point id registered under more than one topic"
                );
            } else {
                by_point.insert(point.point_id().clone(), index);
            }
            points.push(point);
        }

        Ok(Self {
            points: RwLock::new(points),
            by_topic,
            by_point,
            default_sampling,
            state,
            events,
            accepting: AtomicU64::new(NO_GENERATION),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all points in registration order.
    #[must_use]
    pub fn points(&self) -> Vec<MonitoredPoint> {
        self.points.read().clone()
    }

    /// Snapshot of the point registered under `topic`.
    #[must_use]
    pub fn get(&self, topic: &str) -> Option<MonitoredPoint> {
        let index = *self.by_topic.get(&Topic::new(topic))?;
        self.points.read().get(index).cloned()
    }

    fn lookup(&self, key: &str) -> Option<usize> {
        self.by_topic
            .get(&Topic::new(key))
            .or_else(|| self.by_point.get(&PointId::new(key)))
            .copied()
    }

    /// Resolve the point a request addresses.
    ///
    /// Configured topics are tried first, then a reverse point-id lookup. An
    /// unmatched explicit `pointId` yields an ad-hoc point; an unmatched bare
    /// topic is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPoint`] when nothing matches.
    pub fn resolve(&self, request: &Request) -> Result<MonitoredPoint> {
        let topic = request.topic.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let point_id = request
            .point_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let found = topic
            .and_then(|t| self.lookup(t))
            .or_else(|| point_id.and_then(|p| self.lookup(p)));
        if let Some(index) = found {
            if let Some(point) = self.points.read().get(index) {
                return Ok(point.clone());
            }
        }

        match point_id {
            Some(id) => {
                debug!(point_id = id, "Addressing unregistered point directly");
                Ok(MonitoredPoint::ad_hoc(PointId::new(id), self.default_sampling))
            }
            None => Err(Error::UnknownPoint {
                key: topic.unwrap_or_default().to_string(),
            }),
        }
    }

    /// Accept notifications tagged with `generation` from now on.
    pub(crate) fn accept(&self, generation: u64) {
        self.accepting.store(generation, Ordering::SeqCst);
    }

    /// Reject all notifications until the next [`accept`](Self::accept).
    pub(crate) fn close(&self) {
        self.accepting.store(NO_GENERATION, Ordering::SeqCst);
    }

    /// Sink for the point at `index`, bound to one connect attempt.
    pub(crate) fn sink(self: &Arc<Self>, index: usize, generation: u64) -> Arc<dyn NotificationSink> {
        Arc::new(PointSink {
            registry: self.clone(),
            index,
            generation,
        })
    }

    fn deliver(&self, index: usize, generation: u64, sample: Sample) {
        // The store write stays under the points lock so that per-point
        // ordering holds for the store as well as for `last_value`.
        let (topic, point_id) = {
            let mut points = self.points.write();
            if self.accepting.load(Ordering::SeqCst) != generation {
                trace!(index, generation, "Dropping notification from stale link");
                return;
            }
            let Some(point) = points.get_mut(index) else {
                return;
            };
            if !point.record(&sample) {
                debug!(topic = %point.topic(), "Dropping out-of-order sample");
                return;
            }
            self.store(point.topic().as_str(), &sample);
            (point.topic().clone(), point.point_id().clone())
        };

        let event = PointEvent::new(topic, point_id, sample);
        if self.events.publish(event) {
            trace!("Event stream full, oldest event evicted");
        }
    }

    /// Record the result of an explicit read.
    pub(crate) fn record_read(&self, point: &MonitoredPoint, sample: &Sample) {
        let mut points = self.points.write();
        if let Some(&index) = self.by_topic.get(point.topic()) {
            if let Some(registered) = points.get_mut(index) {
                if !registered.record(sample) {
                    debug!(topic = %point.topic(), "Read result older than last value");
                    return;
                }
            }
        }
        self.store(point.topic().as_str(), sample);
    }

    /// Set every configured topic to null in the state store.
    ///
    /// Call after [`close`](Self::close); a notification racing the close
    /// either lands before the null or is rejected.
    pub(crate) fn clear_values(&self) {
        let points = self.points.read();
        for point in points.iter() {
            if let Err(e) = self.state.set(point.topic().as_str(), Value::Null) {
                warn!(topic = %point.topic(), error = %e, "Skipping state clear");
            }
        }
        debug!(points = points.len(), "Cleared point values");
    }

    fn store(&self, key: &str, sample: &Sample) {
        if let Err(e) = self.state.set(key, sample.value.to_json()) {
            warn!(key, error = %e, "Skipping state update");
        }
    }
}

struct PointSink {
    registry: Arc<SubscriptionRegistry>,
    index: usize,
    generation: u64,
}

impl NotificationSink for PointSink {
    fn deliver(&self, sample: Sample) {
        self.registry.deliver(self.index, self.generation, sample);
    }
}
