//! Flowlink - liveness management for perishable remote resources.
//!
//! Keeps two kinds of remote resource usable for a flow-engine pipeline:
//!
//! - a **session** to an industrial point source, with value-change
//!   subscriptions, recovered automatically after failures, and
//! - a **login token**, refreshed before it expires and never fetched twice
//!   concurrently.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Pure types: points, values, declared types, sessions,
//!   tokens, the freshness policy, status signals, requests and responses
//! - [`port`] - Traits at the seams: point source, login service, state
//!   store, status sink, clock
//! - [`application`] - The liveness core: [`ConnectionManager`],
//!   [`SubscriptionRegistry`], [`RequestDispatcher`], [`TokenCache`]
//! - [`adapter`] - HTTP login, in-memory state store, tracing status sink,
//!   system clock and the CLI
//! - [`infrastructure`] - Configuration and the composition root
//!
//! The remote protocol's wire encoding is not part of this crate; plug a
//! protocol library in by implementing [`port::PointConnector`].
//!
//! No connector ships with the crate, so the `flowlink` binary only drives
//! the token side (`token`, `watch`) and validates the connection settings
//! (`check config`). The connection side is a library API: hand your
//! connector to [`build_connection`] and feed requests to the returned
//! dispatcher.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use flowlink::adapter::outbound::state::MemoryStateStore;
//! use flowlink::adapter::outbound::status::TracingStatusSink;
//! use flowlink::infrastructure::bootstrap::build_token_cache;
//! use flowlink::infrastructure::config::settings::Config;
//!
//! # async fn run() -> flowlink::error::Result<()> {
//! let config = Config::load("flowlink.toml")?;
//! let cache = build_token_cache(
//!     &config,
//!     Arc::new(MemoryStateStore::new()),
//!     Arc::new(TracingStatusSink::new("auth")),
//! )?;
//! let grant = cache.ensure(false).await?;
//! println!("token expires at {}", grant.expires_at);
//! # Ok(())
//! # }
//! ```
//!
//! [`ConnectionManager`]: application::connection::ConnectionManager
//! [`SubscriptionRegistry`]: application::connection::SubscriptionRegistry
//! [`RequestDispatcher`]: application::connection::RequestDispatcher
//! [`TokenCache`]: application::token::TokenCache
//! [`build_connection`]: infrastructure::bootstrap::build_connection

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
