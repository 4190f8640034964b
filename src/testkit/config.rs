//! Canonical test configurations.
//!
//! Single source of truth for settings used across tests, so each test
//! module does not define its own slightly different defaults.

use std::time::Duration;

use crate::application::connection::ConnectionSettings;
use crate::domain::coerce::DeclaredType;
use crate::domain::point::PointConfig;
use crate::domain::session::Endpoint;

/// Test endpoint URL.
pub const ENDPOINT: &str = "opc.tcp://127.0.0.1:4840";

/// Connection settings with the given reconnect delay.
#[must_use]
pub fn connection(reconnect_delay: Duration) -> ConnectionSettings {
    ConnectionSettings {
        endpoint: Endpoint::new(ENDPOINT),
        reconnect_delay,
        publishing_interval: Duration::from_millis(100),
        queue_size: 4,
    }
}

/// `{topic: "t1", pointId: "ns=1;s=X", declaredType: Int32}`.
#[must_use]
pub fn int_point() -> PointConfig {
    PointConfig::new("ns=1;s=X")
        .with_topic("t1")
        .with_type(DeclaredType::Int32)
}

/// `count` auto-typed points `p0..` with ids `ns=1;s=P0..`.
#[must_use]
pub fn points(count: usize) -> Vec<PointConfig> {
    (0..count)
        .map(|i| PointConfig::new(format!("ns=1;s=P{i}")).with_topic(format!("p{i}")))
        .collect()
}
