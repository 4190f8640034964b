//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - the command-line interface
//! - [`outbound`] - login transport, state store, status sink and clock

pub mod inbound;
pub mod outbound;
