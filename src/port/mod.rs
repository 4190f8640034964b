//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  (liveness management)  │
//!     ┌──────────────┤                         ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     │                         │                             │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │ Point   │            │   State     │              │  Login    │
//! │ Source  │            │   Store     │              │  Service  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`PointConnector`] and friends - remote point source sessions
//! - [`LoginTransport`] - remote login call
//! - [`StateStore`] - shared key/value state
//! - [`StatusSink`] - status signals
//! - [`Clock`] - current time

pub mod outbound;

pub use outbound::clock::Clock;
pub use outbound::login::{LoginReply, LoginTransport};
pub use outbound::point_source::{
    LinkSignal, LinkSignals, MonitorRequest, NotificationSink, PointClient, PointConnector,
    PointSession, PointSubscription,
};
pub use outbound::state::{keys, StateStore, StateWriter};
pub use outbound::status::{NullStatusSink, StatusFanout, StatusSink};
