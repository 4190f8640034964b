//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the perishable remote resources (point source,
//! login service) and the collaborators the core writes to (state store,
//! status surface, clock).

pub mod clock;
pub mod login;
pub mod point_source;
pub mod state;
pub mod status;
