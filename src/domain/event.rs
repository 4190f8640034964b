//! Events delivered to the downstream pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::id::{PointId, Topic};
use super::value::{PointValue, Sample};

/// A value-change notification for one point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEvent {
    pub topic: Topic,
    pub point_id: PointId,
    pub value: PointValue,
    pub timestamp: DateTime<Utc>,
}

impl PointEvent {
    pub fn new(topic: Topic, point_id: PointId, sample: Sample) -> Self {
        Self {
            topic,
            point_id,
            value: sample.value,
            timestamp: sample.timestamp,
        }
    }

    /// The value as the pipeline sees it.
    #[must_use]
    pub fn payload(&self) -> Value {
        self.value.to_json()
    }

    /// Wire form: `{topic, pointId, payload, timestamp}`.
    #[must_use]
    pub fn to_message(&self) -> EventMessage {
        EventMessage {
            topic: self.topic.to_string(),
            point_id: self.point_id.to_string(),
            payload: self.payload(),
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    pub topic: String,
    pub point_id: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shape() {
        let event = PointEvent::new(
            Topic::from("temp"),
            PointId::from("ns=1;s=T"),
            Sample::new(PointValue::Int32(42), Utc::now()),
        );
        let json = serde_json::to_value(event.to_message()).unwrap();
        assert_eq!(json["topic"], "temp");
        assert_eq!(json["pointId"], "ns=1;s=T");
        assert_eq!(json["payload"], 42);
    }
}
