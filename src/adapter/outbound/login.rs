//! HTTP login transport.
//!
//! Issues `GET {scheme}://{host}:{port}{path}?username=..&password=..` and
//! hands status and body back unparsed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::infrastructure::config::auth::AuthConfig;
use crate::port::{LoginReply, LoginTransport};

/// [`LoginTransport`] backed by `reqwest`.
#[derive(Debug)]
pub struct HttpLogin {
    client: Client,
    url: Url,
}

impl HttpLogin {
    /// Build a transport for a fully formed login URL.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// Build from the `[auth]` section.
    ///
    /// # Errors
    ///
    /// Fails for an invalid login URL or client construction failure.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        Self::new(config.login_url()?, config.timeout())
    }
}

#[async_trait]
impl LoginTransport for HttpLogin {
    async fn fetch(&self) -> Result<LoginReply> {
        debug!(
            host = self.url.host_str().unwrap_or_default(),
            path = self.url.path(),
            "Calling login service"
        );
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status().as_u16();
        // An unreadable body is judged by status alone.
        let body = response.text().await.unwrap_or_default();
        Ok(LoginReply::new(status, body))
    }
}
