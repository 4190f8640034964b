//! Status signals emitted on every state change.
//!
//! These feed an external observability surface and are part of the public
//! contract, separate from logging.

use std::fmt;

/// How urgent a status is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Pending,
    Warning,
    Error,
    Idle,
}

/// Indicator shape: solid for settled states, ring for transitional ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Dot,
    Ring,
}

/// Which transition produced the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Connecting,
    Connected,
    Degraded,
    Reconnecting,
    Disconnected,
    Stopped,
    TokenValid,
    TokenRefreshed,
    TokenFailed,
    TokenCleared,
}

/// A `{severity, shape, text}` status tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub severity: Severity,
    pub shape: Shape,
    pub text: String,
}

impl Status {
    fn new(kind: StatusKind, severity: Severity, shape: Shape, text: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            shape,
            text: text.into(),
        }
    }

    pub fn connecting(endpoint: &str) -> Self {
        Self::new(
            StatusKind::Connecting,
            Severity::Pending,
            Shape::Ring,
            format!("connecting to {endpoint}"),
        )
    }

    pub fn connected(points: usize) -> Self {
        Self::new(
            StatusKind::Connected,
            Severity::Ok,
            Shape::Dot,
            format!("connected ({points} points)"),
        )
    }

    pub fn degraded(reason: &str) -> Self {
        Self::new(
            StatusKind::Degraded,
            Severity::Error,
            Shape::Ring,
            format!("degraded: {reason}"),
        )
    }

    pub fn reconnecting(delay_secs: u64, reason: &str) -> Self {
        Self::new(
            StatusKind::Reconnecting,
            Severity::Warning,
            Shape::Ring,
            format!("reconnecting in {delay_secs}s: {reason}"),
        )
    }

    pub fn disconnected() -> Self {
        Self::new(StatusKind::Disconnected, Severity::Idle, Shape::Ring, "disconnected")
    }

    pub fn stopped() -> Self {
        Self::new(StatusKind::Stopped, Severity::Idle, Shape::Dot, "stopped")
    }

    pub fn token_valid() -> Self {
        Self::new(StatusKind::TokenValid, Severity::Ok, Shape::Dot, "token valid")
    }

    pub fn token_refreshed() -> Self {
        Self::new(StatusKind::TokenRefreshed, Severity::Ok, Shape::Dot, "token refreshed")
    }

    pub fn token_failed(reason: &str) -> Self {
        Self::new(
            StatusKind::TokenFailed,
            Severity::Error,
            Shape::Ring,
            format!("login failed: {reason}"),
        )
    }

    pub fn token_cleared() -> Self {
        Self::new(StatusKind::TokenCleared, Severity::Idle, Shape::Ring, "logged out")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
