//! Point source port: the remote industrial data source.
//!
//! The protocol library sits behind these traits. Each level owns the next:
//! a client hosts sessions, a session hosts subscriptions, a subscription
//! hosts monitored points. Teardown runs in the reverse order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::id::PointId;
use crate::domain::session::Endpoint;
use crate::domain::value::{PointValue, Sample};
use crate::error::Result;

/// Out-of-band events reported by the protocol side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSignal {
    /// The transport connection dropped.
    ConnectionLost { reason: String },
    /// The server ended the notification stream of a subscription.
    SubscriptionTerminated { reason: String },
}

impl LinkSignal {
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::ConnectionLost { reason } | Self::SubscriptionTerminated { reason } => reason,
        }
    }
}

/// Channel the protocol side uses to report [`LinkSignal`]s.
///
/// Tagged with the connect attempt it belongs to so that signals from a
/// torn-down link can be told apart from current ones.
#[derive(Debug, Clone)]
pub struct LinkSignals {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, LinkSignal)>,
}

impl LinkSignals {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, LinkSignal)>) -> Self {
        Self { generation, tx }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Report a signal. Ignored once the manager has gone away.
    pub fn send(&self, signal: LinkSignal) {
        let _ = self.tx.send((self.generation, signal));
    }
}

/// Receives value-change notifications for one monitored point.
///
/// Called from the protocol side; implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, sample: Sample);
}

/// Parameters for monitoring a single point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRequest {
    pub point_id: PointId,
    pub sampling_interval: Duration,
    /// Server-side buffer size for this point.
    pub queue_size: u32,
    /// Evict the oldest buffered sample when the buffer is full.
    pub discard_oldest: bool,
}

/// Opens client connections to a point source.
#[async_trait]
pub trait PointConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        signals: LinkSignals,
    ) -> Result<Arc<dyn PointClient>>;
}

/// A connected client handle.
#[async_trait]
pub trait PointClient: Send + Sync {
    async fn create_session(&self) -> Result<Arc<dyn PointSession>>;

    async fn disconnect(&self) -> Result<()>;
}

/// An established session.
#[async_trait]
pub trait PointSession: Send + Sync {
    async fn create_subscription(
        &self,
        publishing_interval: Duration,
    ) -> Result<Arc<dyn PointSubscription>>;

    async fn read(&self, point_id: &PointId) -> Result<Sample>;

    /// Write a value; returns the remote status code (`0` is good).
    async fn write(&self, point_id: &PointId, value: &PointValue) -> Result<u32>;

    async fn close(&self) -> Result<()>;
}

/// A subscription delivering notifications for monitored points.
#[async_trait]
pub trait PointSubscription: Send + Sync {
    async fn monitor(
        &self,
        request: MonitorRequest,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<()>;

    async fn terminate(&self) -> Result<()>;
}
