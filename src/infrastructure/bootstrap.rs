//! Composition root: wires ports, adapters and services from configuration.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::clock::SystemClock;
use crate::adapter::outbound::login::HttpLogin;
use crate::application::connection::{ConnectionManager, RequestDispatcher, SubscriptionRegistry};
use crate::application::queue::{drop_oldest, Subscriber};
use crate::application::token::{TokenCache, TokenPoller};
use crate::domain::event::PointEvent;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;
use crate::port::{PointConnector, StateStore, StateWriter, StatusSink};

/// State-store owner name for point values.
pub const CONNECTION_OWNER: &str = "connection";
/// State-store owner name for `Auth.*` keys.
pub const AUTH_OWNER: &str = "auth";

/// The connection side, ready to start.
pub struct ConnectionStack {
    pub manager: ConnectionManager,
    pub dispatcher: RequestDispatcher,
    /// Downstream event stream.
    pub events: Subscriber<PointEvent>,
}

/// Build the connection side around a protocol connector.
///
/// This is the entry point for embedding the connection side; the binary
/// has no connector of its own and never calls it.
///
/// # Errors
///
/// Fails if the point configuration contains duplicate topics.
pub fn build_connection(
    config: &Config,
    connector: Arc<dyn PointConnector>,
    store: Arc<dyn StateStore>,
    status: Arc<dyn StatusSink>,
) -> Result<ConnectionStack> {
    let (publisher, events) = drop_oldest(config.events.capacity);
    let registry = Arc::new(SubscriptionRegistry::new(
        &config.points,
        config.subscription.default_sampling(),
        StateWriter::new(store, CONNECTION_OWNER),
        publisher,
    )?);
    let manager = ConnectionManager::new(connector, registry, config.connection_settings(), status);
    let dispatcher = RequestDispatcher::new(manager.clone());

    info!(
        endpoint = %config.endpoint.url,
        points = config.points.len(),
        reconnect_delay_secs = config.reconnect.delay_secs,
        "Connection stack built"
    );
    Ok(ConnectionStack {
        manager,
        dispatcher,
        events,
    })
}

/// Build the token cache against the configured login service.
///
/// # Errors
///
/// Fails when `[auth]` has no host or the login URL is invalid.
pub fn build_token_cache(
    config: &Config,
    store: Arc<dyn StateStore>,
    status: Arc<dyn StatusSink>,
) -> Result<TokenCache> {
    if !config.auth.is_configured() {
        return Err(ConfigError::MissingField { field: "auth.host" }.into());
    }
    let transport = HttpLogin::from_config(&config.auth)?;
    Ok(TokenCache::new(
        Arc::new(transport),
        Arc::new(SystemClock),
        StateWriter::new(store, AUTH_OWNER),
        status,
        config.auth.token_settings(),
    ))
}

/// Start the background poll if `auth.poll_interval_secs` is non-zero.
#[must_use]
pub fn start_token_poll(config: &Config, cache: &TokenCache) -> Option<TokenPoller> {
    TokenPoller::spawn(cache.clone(), config.auth.poll_interval())
}
