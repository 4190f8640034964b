//! Infrastructure configuration modules.

pub mod auth;
pub mod connection;
pub mod logging;
pub mod settings;
