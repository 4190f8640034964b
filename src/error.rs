//! Error types for the crate.
//!
//! Every remote-call failure is converted into one of these variants at the
//! call boundary. None of them is fatal to the owning process.

use thiserror::Error;

use crate::domain::session::Phase;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("duplicate topic '{topic}' in point configuration")]
    DuplicateTopic { topic: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Outcome detail of a failed login.
///
/// Cloneable because a single login call is observed by every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthFailure {
    /// Human-readable failure detail.
    pub message: String,
    /// HTTP status of the login call, `0` when no response was received.
    pub status_code: u16,
    /// Last return code reported by the login service, if any.
    pub retcode: Option<i64>,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("{stage} failed: {reason}")]
    Transport { stage: &'static str, reason: String },

    #[error("unknown point '{key}': no configured topic or point id matches")]
    UnknownPoint { key: String },

    #[error("request requires an active session (current phase: {phase})")]
    NotConnected { phase: Phase },

    #[error("action '{action}' is not supported here")]
    UnsupportedAction { action: String },

    #[error("state key '{key}' is owned by {owner}")]
    KeyOwned { key: String, owner: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Build a transport error for the named remote stage.
    pub fn transport(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Transport {
            stage,
            reason: reason.into(),
        }
    }

    /// Status code to report to the caller; `0` means a local failure.
    #[must_use]
    pub fn status_code(&self) -> u32 {
        match self {
            Self::Auth(failure) => u32::from(failure.status_code),
            Self::Http(err) => err.status().map_or(0, |s| u32::from(s.as_u16())),
            _ => 0,
        }
    }

    /// True for errors caused by the remote side or the network.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
