//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`source`] - Scripted point source: connector, client, session and
//!   subscription doubles plus a [`SourceTap`] to drive and inspect them.
//! - [`login`] - [`ScriptedLogin`] transport with an optional gate.
//! - [`status`] - [`RecordingStatusSink`].
//! - [`clock`] - [`ManualClock`].
//! - [`config`] - Canonical test settings and point configurations.

pub mod clock;
pub mod config;
pub mod login;
pub mod source;
pub mod status;

pub use clock::ManualClock;
pub use login::ScriptedLogin;
pub use source::{ScriptedConnector, SourceTap};
pub use status::RecordingStatusSink;
