//! Login service port.

use async_trait::async_trait;

use crate::error::Result;

/// Raw reply of the login service; parsing happens in the token cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginReply {
    /// HTTP status code.
    pub status: u16,
    pub body: String,
}

impl LoginReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Performs the remote login call.
///
/// `Err` means no reply was received at all (connection refused, timeout).
#[async_trait]
pub trait LoginTransport: Send + Sync {
    async fn fetch(&self) -> Result<LoginReply>;
}
