//! Session record and the connection lifecycle transition table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where and how to reach the remote point source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(default = "default_security_mode")]
    pub security_mode: String,
    #[serde(default = "default_security_policy")]
    pub security_policy: String,
}

fn default_security_mode() -> String {
    "None".into()
}

fn default_security_policy() -> String {
    "None".into()
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            security_mode: default_security_mode(),
            security_policy: default_security_policy(),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("")
    }
}

/// Lifecycle phase of a connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Disconnected,
    Connecting,
    SubscriptionSetup,
    /// The only phase in which reads, writes and value updates happen.
    Active,
    /// A failure was observed and no reconnect is pending.
    Degraded,
    ReconnectPending,
    /// Terminal; nothing restarts a stopped manager.
    Stopped,
}

/// What a reconnect request does in a given phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Arm the reconnect timer.
    Schedule,
    /// A timer is already armed; the request is absorbed.
    AlreadyPending,
    /// An attempt is running; it observes the failure when it completes.
    AttemptInFlight,
    /// Shutting down; the request is dropped.
    Stopping,
}

impl Phase {
    /// Transition table for reconnect requests.
    ///
    /// At most one reconnect may be pending at a time, regardless of how
    /// many sources ask for one.
    #[must_use]
    pub const fn on_reconnect_request(self) -> ReconnectDecision {
        match self {
            Self::ReconnectPending => ReconnectDecision::AlreadyPending,
            Self::Connecting | Self::SubscriptionSetup => ReconnectDecision::AttemptInFlight,
            Self::Stopped => ReconnectDecision::Stopping,
            Self::Disconnected | Self::Active | Self::Degraded => ReconnectDecision::Schedule,
        }
    }

    /// True while a connect attempt is running.
    #[must_use]
    pub const fn is_attempting(self) -> bool {
        matches!(self, Self::Connecting | Self::SubscriptionSetup)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::SubscriptionSetup => "subscription setup",
            Self::Active => "active",
            Self::Degraded => "degraded",
            Self::ReconnectPending => "reconnect pending",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse state of the session as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Active,
    Degraded,
}

impl From<Phase> for SessionState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Disconnected | Phase::Stopped => Self::Disconnected,
            Phase::Connecting | Phase::SubscriptionSetup => Self::Connecting,
            Phase::Active => Self::Active,
            Phase::Degraded | Phase::ReconnectPending => Self::Degraded,
        }
    }
}

/// Snapshot of the current session.
///
/// A new record is built for every connect attempt; a failed session is
/// never revived in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub state: SessionState,
    pub endpoint: String,
    pub security_mode: String,
    pub security_policy: String,
    pub last_error: Option<String>,
}

impl Session {
    #[must_use]
    pub fn disconnected(endpoint: &Endpoint) -> Self {
        Self {
            state: SessionState::Disconnected,
            endpoint: endpoint.url.clone(),
            security_mode: endpoint.security_mode.clone(),
            security_policy: endpoint.security_policy.clone(),
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_reconnect_absorbs_requests() {
        assert_eq!(
            Phase::ReconnectPending.on_reconnect_request(),
            ReconnectDecision::AlreadyPending
        );
    }

    #[test]
    fn test_in_flight_attempt_defers_requests() {
        assert_eq!(
            Phase::Connecting.on_reconnect_request(),
            ReconnectDecision::AttemptInFlight
        );
        assert_eq!(
            Phase::SubscriptionSetup.on_reconnect_request(),
            ReconnectDecision::AttemptInFlight
        );
    }

    #[test]
    fn test_stopped_drops_requests() {
        assert_eq!(
            Phase::Stopped.on_reconnect_request(),
            ReconnectDecision::Stopping
        );
    }

    #[test]
    fn test_active_and_degraded_schedule() {
        assert_eq!(Phase::Active.on_reconnect_request(), ReconnectDecision::Schedule);
        assert_eq!(Phase::Degraded.on_reconnect_request(), ReconnectDecision::Schedule);
    }

    #[test]
    fn test_session_state_projection() {
        assert_eq!(SessionState::from(Phase::ReconnectPending), SessionState::Degraded);
        assert_eq!(SessionState::from(Phase::SubscriptionSetup), SessionState::Connecting);
        assert_eq!(SessionState::from(Phase::Stopped), SessionState::Disconnected);
    }
}
