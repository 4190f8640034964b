//! Inbound requests from the pipeline and the responses sent back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::id::CorrelationId;
use crate::error::Error;

/// What a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    /// Bypass freshness/liveness checks and go to the remote side now.
    Force,
    /// Drop local state without a remote call.
    #[serde(alias = "disconnect")]
    Logout,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Force => "force",
            Self::Logout => "logout",
        }
    }
}

/// `{action?, topic?, pointId?, payload?, declaredType?}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub point_id: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub correlation_id: CorrelationId,
}

impl Request {
    pub fn read(topic: impl Into<String>) -> Self {
        Self {
            action: Some(Action::Read),
            topic: Some(topic.into()),
            ..Self::default()
        }
    }

    pub fn write(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            action: Some(Action::Write),
            topic: Some(topic.into()),
            payload: Some(payload),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_action(action: Action) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_point_id(mut self, point_id: impl Into<String>) -> Self {
        self.point_id = Some(point_id.into());
        self
    }

    #[must_use]
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }
}

/// `{payload, statusCode}` sent back for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub payload: Value,
    pub status_code: u32,
    pub correlation_id: String,
}

impl Response {
    pub fn ok(correlation_id: &CorrelationId, payload: Value, status_code: u32) -> Self {
        Self {
            payload,
            status_code,
            correlation_id: correlation_id.to_string(),
        }
    }

    /// Failure response; `statusCode` is `0` when no remote status exists.
    pub fn error(correlation_id: &CorrelationId, error: &Error) -> Self {
        Self {
            payload: json!({ "error": error.to_string() }),
            status_code: error.status_code(),
            correlation_id: correlation_id.to_string(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }
}
