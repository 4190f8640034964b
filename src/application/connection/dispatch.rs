//! Request dispatcher: synchronous reads and writes against the live session.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::manager::ConnectionManager;
use crate::domain::coerce::DeclaredType;
use crate::domain::id::{PointId, Topic};
use crate::domain::point::MonitoredPoint;
use crate::domain::request::{Action, Request, Response};
use crate::domain::value::PointValue;
use crate::error::{Error, Result};

/// HTTP-style status reported for requests served without a remote status.
const STATUS_OK: u32 = 200;

/// Result of a remote read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub topic: Topic,
    pub point_id: PointId,
    pub value: PointValue,
    pub timestamp: DateTime<Utc>,
}

impl ReadOutcome {
    #[must_use]
    pub fn to_payload(&self) -> Value {
        json!({
            "topic": self.topic.as_str(),
            "pointId": self.point_id.as_str(),
            "value": self.value.to_json(),
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

/// Result of a remote write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub topic: Topic,
    pub point_id: PointId,
    pub value: PointValue,
    pub declared_type: DeclaredType,
    /// Status code returned by the remote side; zero means good.
    pub remote_status: u32,
}

impl WriteOutcome {
    #[must_use]
    pub const fn is_good(&self) -> bool {
        self.remote_status == 0
    }

    #[must_use]
    pub fn to_payload(&self) -> Value {
        json!({
            "topic": self.topic.as_str(),
            "pointId": self.point_id.as_str(),
            "value": self.value.to_json(),
            "declaredType": self.declared_type.as_str(),
            "remoteStatus": self.remote_status,
            "good": self.is_good(),
        })
    }
}

/// Serves read/write requests; only an `Active` manager accepts them.
#[derive(Clone)]
pub struct RequestDispatcher {
    connection: ConnectionManager,
}

impl RequestDispatcher {
    pub const fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    #[must_use]
    pub const fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Read the current value of the addressed point.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPoint`] for an unresolvable key, [`Error::NotConnected`]
    /// outside `Active`, or the transport failure of the read itself.
    pub async fn read(&self, request: &Request) -> Result<ReadOutcome> {
        let point = self.connection.registry().resolve(request)?;
        let session = self.connection.active_session()?;

        let sample = self.observe(session.read(point.point_id()).await)?;
        self.connection.registry().record_read(&point, &sample);
        debug!(topic = %point.topic(), value = ?sample.value, "Read point");

        Ok(ReadOutcome {
            topic: point.topic().clone(),
            point_id: point.point_id().clone(),
            value: sample.value,
            timestamp: sample.timestamp,
        })
    }

    /// Write the request payload to the addressed point.
    ///
    /// # Errors
    ///
    /// As for [`read`](Self::read); additionally a write without payload is
    /// rejected.
    pub async fn write(&self, request: &Request) -> Result<WriteOutcome> {
        let point = self.connection.registry().resolve(request)?;
        let Some(payload) = request.payload.as_ref() else {
            return Err(Error::UnsupportedAction {
                action: "write without payload".into(),
            });
        };
        let session = self.connection.active_session()?;

        let declared_type = effective_type(request, &point);
        let value = declared_type.coerce(payload);
        let remote_status = self.observe(session.write(point.point_id(), &value).await)?;
        if remote_status != 0 {
            warn!(topic = %point.topic(), remote_status, "Write rejected by remote side");
        } else {
            debug!(topic = %point.topic(), value = ?value, "Wrote point");
        }

        Ok(WriteOutcome {
            topic: point.topic().clone(),
            point_id: point.point_id().clone(),
            value,
            declared_type,
            remote_status,
        })
    }

    /// Dispatch an inbound request and build its response.
    ///
    /// Without an explicit action, a request carrying a payload is a write
    /// and anything else is a read.
    pub async fn handle(&self, request: Request) -> Response {
        let action = request.action.unwrap_or(if request.payload.is_some() {
            Action::Write
        } else {
            Action::Read
        });
        let id = request.correlation_id.clone();

        let result = match action {
            Action::Read => self.read(&request).await.map(|r| r.to_payload()),
            Action::Write => self.write(&request).await.map(|w| w.to_payload()),
            Action::Force => self
                .connection
                .force_reconnect()
                .await
                .map(|()| json!({ "phase": self.connection.phase().as_str() })),
            Action::Logout => {
                self.connection.disconnect().await;
                Ok(json!({ "phase": self.connection.phase().as_str() }))
            }
        };

        match result {
            Ok(payload) => Response::ok(&id, payload, STATUS_OK),
            Err(e) => {
                warn!(action = action.as_str(), error = %e, "Request failed");
                Response::error(&id, &e)
            }
        }
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.connection.mark_healthy();
                Ok(value)
            }
            Err(e) => {
                if e.is_transport() {
                    self.connection.mark_degraded(&e.to_string());
                }
                Err(e)
            }
        }
    }
}

/// Request-supplied type, else the point's configured type; `Auto` infers.
fn effective_type(request: &Request, point: &MonitoredPoint) -> DeclaredType {
    request
        .declared_type
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or(point.declared_type(), DeclaredType::lenient)
}
