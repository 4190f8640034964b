//! Application services: the liveness core.
//!
//! These services drive the domain state machines and talk to the outside
//! world only through the traits in [`crate::port`].

pub mod connection;
pub mod queue;
pub mod token;
