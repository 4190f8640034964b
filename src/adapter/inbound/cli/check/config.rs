use std::path::Path;

use anyhow::{Context, Result};

use crate::adapter::inbound::cli::output;
use crate::infrastructure::config::auth::{PASSWORD_ENV, USERNAME_ENV};
use crate::infrastructure::config::settings::Config;

/// Validate a configuration file without connecting anywhere.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    let config = Config::load(path)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    let report = ConfigReport::from_config(&config);

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");

    output::section("Connection");
    output::field("Endpoint", or_unset(&report.endpoint));
    output::field("Security", &report.security);
    output::field("Points", report.points);
    if report.reconnect_delay_secs == 0 {
        output::warning("Automatic reconnect disabled (reconnect.delay_secs = 0)");
    } else {
        output::field("Reconnect", format!("{}s", report.reconnect_delay_secs));
    }

    output::section("Auth");
    if report.auth_configured {
        output::field("Login", &report.login_url);
        output::field("Poll", match report.poll_interval_secs {
            0 => "disabled".to_string(),
            secs => format!("every {secs}s"),
        });
        if !report.credentials_present {
            output::warning(&format!(
                "No credentials configured (set {USERNAME_ENV} / {PASSWORD_ENV})"
            ));
        }
    } else {
        output::field("Login", "not configured");
    }

    output::success("Configuration check complete");
    Ok(())
}

/// What `check config` reports about a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigReport {
    pub endpoint: String,
    pub security: String,
    pub points: usize,
    pub reconnect_delay_secs: u64,
    pub auth_configured: bool,
    /// Login URL without credentials.
    pub login_url: String,
    pub poll_interval_secs: u64,
    pub credentials_present: bool,
}

impl ConfigReport {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let auth = &config.auth;
        Self {
            endpoint: config.endpoint.url.clone(),
            security: format!(
                "{} / {}",
                config.endpoint.security_mode, config.endpoint.security_policy
            ),
            points: config.points.len(),
            reconnect_delay_secs: config.reconnect.delay_secs,
            auth_configured: auth.is_configured(),
            login_url: auth
                .base_url()
                .map(|u| u.to_string())
                .unwrap_or_default(),
            poll_interval_secs: auth.poll_interval_secs,
            credentials_present: auth.username.is_some() || auth.password.is_some(),
        }
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}
