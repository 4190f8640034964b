//! `token` and `watch` commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::info;

use crate::adapter::inbound::cli::output;
use crate::adapter::outbound::state::MemoryStateStore;
use crate::application::token::TokenCache;
use crate::domain::request::{Action, Request, Response};
use crate::domain::status::Status;
use crate::infrastructure::bootstrap::{build_token_cache, start_token_poll, AUTH_OWNER};
use crate::infrastructure::config::settings::Config;
use crate::port::StatusSink;

/// Prints status signals to the terminal.
pub struct ConsoleStatusSink {
    source: &'static str,
}

impl ConsoleStatusSink {
    #[must_use]
    pub const fn new(source: &'static str) -> Self {
        Self { source }
    }
}

impl StatusSink for ConsoleStatusSink {
    fn emit(&self, status: Status) {
        output::status(self.source, &status);
    }
}

/// Ensure a token once and print the response.
pub async fn execute_token<P: AsRef<Path>>(config_path: P, force: bool) -> Result<()> {
    let (_, cache) = load_cache(config_path.as_ref())?;

    let action = if force { Action::Force } else { Action::Read };
    let response = cache.handle(Request::with_action(action)).await;
    output::document(&serde_json::to_value(&response)?);
    login_outcome(&response)
}

/// Map a token response to the command's exit status.
fn login_outcome(response: &Response) -> Result<()> {
    if !response.is_error() {
        return Ok(());
    }
    let reason = response.payload["error"].as_str().unwrap_or("unknown error");
    match response.status_code {
        0 => bail!("login failed: {reason}"),
        status => bail!("login failed (HTTP {status}): {reason}"),
    }
}

/// Run the token poll until Ctrl-C.
pub async fn execute_watch<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let (config, cache) = load_cache(config_path.as_ref())?;
    config.init_logging();

    let Some(poller) = start_token_poll(&config, &cache) else {
        output::warning("auth.poll_interval_secs is 0; nothing to watch");
        return Ok(());
    };
    output::success("Watching token freshness (Ctrl-C to stop)");

    signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutdown signal received");
    poller.shutdown().await;
    cache.logout();
    Ok(())
}

fn load_cache(path: &Path) -> Result<(Config, TokenCache)> {
    let config = Config::load(path)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    let cache = build_token_cache(
        &config,
        Arc::new(MemoryStateStore::new()),
        Arc::new(ConsoleStatusSink::new(AUTH_OWNER)),
    )
    .context("cannot build the token cache")?;
    Ok((config, cache))
}
