//! Scripted login transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::port::{LoginReply, LoginTransport};

/// A [`LoginTransport`] returning pre-loaded replies in order.
///
/// Once the script runs out every call fails as if the service were
/// unreachable. An optional gate holds each call until notified, which lets
/// tests pile up concurrent callers behind one in-flight login.
pub struct ScriptedLogin {
    replies: Mutex<VecDeque<Result<LoginReply>>>,
    calls: Arc<AtomicU32>,
    gate: Option<Arc<Notify>>,
}

impl Default for ScriptedLogin {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLogin {
    #[must_use]
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Arc::new(AtomicU32::new(0)),
            gate: None,
        }
    }

    #[must_use]
    pub fn with_reply(self, status: u16, body: &str) -> Self {
        self.replies.lock().push_back(Ok(LoginReply::new(status, body)));
        self
    }

    /// Queue a call that receives no reply at all.
    #[must_use]
    pub fn with_error(self, reason: &str) -> Self {
        self.replies
            .lock()
            .push_back(Err(Error::transport("login", reason)));
        self
    }

    /// Queue a successful login for `token` with the given TTL.
    #[must_use]
    pub fn with_token(self, token: &str, ttl_secs: i64) -> Self {
        let body = format!(
            r#"{{"retcode":0,"payload":{{"sessiontoken":"{token}","ttl":{ttl_secs}}}}}"#
        );
        self.with_reply(200, &body)
    }

    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Shared counter of `fetch` calls.
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicU32> {
        self.calls.clone()
    }
}

#[async_trait]
impl LoginTransport for ScriptedLogin {
    async fn fetch(&self) -> Result<LoginReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let reply = self.replies.lock().pop_front();
        reply.unwrap_or_else(|| Err(Error::transport("login", "no scripted reply")))
    }
}
