//! Protocol-agnostic domain types.
//!
//! Everything here is pure data and pure functions; remote calls live behind
//! the traits in [`crate::port`].

pub mod coerce;
pub mod event;
pub mod freshness;
pub mod id;
pub mod point;
pub mod request;
pub mod session;
pub mod status;
pub mod token;
pub mod value;

pub use coerce::DeclaredType;
pub use event::PointEvent;
pub use id::{CorrelationId, PointId, Topic};
pub use point::{MonitoredPoint, PointConfig};
pub use request::{Action, Request, Response};
pub use session::{Endpoint, Phase, Session, SessionState};
pub use status::{Severity, Shape, Status, StatusKind};
pub use token::Token;
pub use value::{PointValue, Sample};
