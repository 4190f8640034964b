//! Outbound adapters (driven side).

pub mod clock;
pub mod login;
pub mod state;
pub mod status;
