//! Token freshness cache.
//!
//! Keeps a session token from the login service fresh. A cached token is
//! reused while `now < expiresAt - skew`; otherwise a login call replaces
//! it. At most one login call is in flight per cache: concurrent callers
//! await the call already running instead of starting their own.

mod parse;
mod poll;

pub use parse::{parse_login, LoginGrant};
pub use poll::TokenPoller;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::freshness::token_is_fresh;
use crate::domain::request::{Action, Request, Response};
use crate::domain::status::Status;
use crate::domain::token::Token;
use crate::error::{AuthFailure, Error};
use crate::port::{keys, Clock, LoginTransport, StateWriter, StatusSink};

/// HTTP-style status reported for successful token responses.
const STATUS_OK: u32 = 200;

/// Result of `ensure`/`login`, shared by every caller of one login call.
pub type LoginOutcome = std::result::Result<TokenGrant, AuthFailure>;

type InFlight = Shared<BoxFuture<'static, LoginOutcome>>;

/// Timing policy of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    /// Refresh this long before the token actually expires.
    pub skew: Duration,
    /// Lifetime assumed when the login response names no expiry.
    pub default_lifetime: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            skew: Duration::seconds(60),
            default_lifetime: Duration::minutes(30),
        }
    }
}

/// A usable token handed to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub retcode: i64,
    /// True when served from cache without a remote call.
    pub reused: bool,
}

impl TokenGrant {
    /// Response payload: `{token, expiresAt, retcode, reused}`.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        json!({
            "token": self.token,
            "expiresAt": format_expiry(self.expires_at),
            "retcode": self.retcode,
            "reused": self.reused,
        })
    }
}

struct Inner {
    transport: Arc<dyn LoginTransport>,
    clock: Arc<dyn Clock>,
    state: StateWriter,
    status: Arc<dyn StatusSink>,
    settings: TokenSettings,
    token: Mutex<Token>,
    in_flight: Mutex<Option<InFlight>>,
    login_calls: AtomicU64,
}

/// Cheap to clone; clones share the token and the in-flight guard.
#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<Inner>,
}

impl TokenCache {
    pub fn new(
        transport: Arc<dyn LoginTransport>,
        clock: Arc<dyn Clock>,
        state: StateWriter,
        status: Arc<dyn StatusSink>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                clock,
                state,
                status,
                settings,
                token: Mutex::new(Token::default()),
                in_flight: Mutex::new(None),
                login_calls: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the cached token.
    #[must_use]
    pub fn current(&self) -> Token {
        self.inner.token.lock().clone()
    }

    /// Number of remote login calls issued so far.
    #[must_use]
    pub fn login_calls(&self) -> u64 {
        self.inner.login_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn settings(&self) -> TokenSettings {
        self.inner.settings
    }

    /// Return a usable token, logging in only when needed.
    ///
    /// With `force` the cached token is ignored and a login is always
    /// awaited (joining one already in flight).
    pub async fn ensure(&self, force: bool) -> LoginOutcome {
        if !force {
            if let Some(grant) = self.reusable() {
                debug!(expires_at = %grant.expires_at, "Reusing cached token");
                return Ok(grant);
            }
        }
        self.login().await
    }

    /// Log in and replace the cached token.
    ///
    /// Joins the login call already in flight, if there is one.
    pub async fn login(&self) -> LoginOutcome {
        let call = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(call) => {
                    debug!("Joining login already in flight");
                    call.clone()
                }
                None => {
                    let inner = self.inner.clone();
                    let call = async move {
                        let outcome = inner.perform_login().await;
                        *inner.in_flight.lock() = None;
                        outcome
                    }
                    .boxed()
                    .shared();
                    *slot = Some(call.clone());
                    call
                }
            }
        };
        call.await
    }

    /// Drop the cached token. Purely local; no remote call is made.
    pub fn logout(&self) {
        *self.inner.token.lock() = Token::cleared(None);
        self.inner.store(None, None, None);
        info!("Token cleared");
        self.inner.status.emit(Status::token_cleared());
    }

    /// Serve an inbound request.
    ///
    /// `read` and an absent action ensure a token, `force` always logs in and
    /// `logout` clears the cache.
    pub async fn handle(&self, request: Request) -> Response {
        let id = request.correlation_id.clone();
        let outcome = match request.action.unwrap_or(Action::Read) {
            Action::Read => self.ensure(false).await,
            Action::Force => self.ensure(true).await,
            Action::Logout => {
                self.logout();
                return Response::ok(
                    &id,
                    json!({ "token": null, "expiresAt": null, "retcode": null }),
                    STATUS_OK,
                );
            }
            Action::Write => {
                return Response::error(
                    &id,
                    &Error::UnsupportedAction {
                        action: Action::Write.as_str().into(),
                    },
                );
            }
        };

        match outcome {
            Ok(grant) => Response::ok(&id, grant.to_payload(), STATUS_OK),
            Err(failure) => {
                let mut response = Response::error(&id, &Error::Auth(failure.clone()));
                response.payload["retcode"] = json!(failure.retcode);
                response
            }
        }
    }

    pub(crate) fn emit(&self, status: Status) {
        self.inner.status.emit(status);
    }

    fn reusable(&self) -> Option<TokenGrant> {
        let now = self.inner.clock.now();
        let token = self.inner.token.lock();
        if !token_is_fresh(&token, now, self.inner.settings.skew) {
            return None;
        }
        Some(TokenGrant {
            token: token.value()?.to_string(),
            expires_at: token.expires_at()?,
            retcode: token.retcode().unwrap_or(0),
            reused: true,
        })
    }
}

impl Inner {
    async fn perform_login(&self) -> LoginOutcome {
        self.login_calls.fetch_add(1, Ordering::Relaxed);
        let reply = self.transport.fetch().await;
        let now = self.clock.now();

        let parsed = match reply {
            Ok(reply) => parse_login(&reply, now, self.settings.default_lifetime),
            Err(e) => Err(AuthFailure {
                message: e.to_string(),
                status_code: u16::try_from(e.status_code()).unwrap_or(0),
                retcode: None,
            }),
        };

        match parsed {
            Ok(grant) => {
                *self.token.lock() = Token::issued(&grant.token, grant.expires_at, grant.retcode);
                self.store(
                    Some(json!(grant.token)),
                    Some(grant.retcode),
                    Some(grant.expires_at),
                );
                info!(expires_at = %grant.expires_at, "Token refreshed");
                self.status.emit(Status::token_refreshed());
                Ok(TokenGrant {
                    token: grant.token,
                    expires_at: grant.expires_at,
                    retcode: grant.retcode,
                    reused: false,
                })
            }
            Err(mut failure) => {
                let retcode = {
                    let mut token = self.token.lock();
                    let retcode = failure.retcode.or(token.retcode());
                    *token = Token::cleared(retcode);
                    retcode
                };
                failure.retcode = retcode;
                self.store(None, retcode, None);
                warn!(
                    status_code = failure.status_code,
                    retcode = ?retcode,
                    error = %failure,
                    "Login failed"
                );
                self.status.emit(Status::token_failed(&failure.message));
                Err(failure)
            }
        }
    }

    fn store(&self, token: Option<Value>, retcode: Option<i64>, expires_at: Option<DateTime<Utc>>) {
        let entries = [
            (keys::AUTH_SESSION_TOKEN, token.unwrap_or(Value::Null)),
            (keys::AUTH_RETCODE, retcode.map_or(Value::Null, |c| json!(c))),
            (
                keys::AUTH_EXPIRES_AT,
                expires_at.map_or(Value::Null, |at| json!(format_expiry(at))),
            ),
        ];
        for (key, value) in entries {
            if let Err(e) = self.state.set(key, value) {
                warn!(key, error = %e, "Skipping state update");
            }
        }
    }
}

fn format_expiry(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::state::MemoryStateStore;
    use crate::port::{NullStatusSink, StateStore};
    use crate::testkit::{ManualClock, ScriptedLogin};

    fn cache(login: ScriptedLogin, clock: Arc<ManualClock>) -> (TokenCache, Arc<MemoryStateStore>) {
        let store = Arc::new(MemoryStateStore::new());
        let cache = TokenCache::new(
            Arc::new(login),
            clock,
            StateWriter::new(store.clone(), "auth"),
            Arc::new(NullStatusSink),
            TokenSettings::default(),
        );
        (cache, store)
    }

    #[tokio::test]
    async fn test_failure_clears_token_but_keeps_retcode() {
        let clock = Arc::new(ManualClock::default());
        let login = ScriptedLogin::new()
            .with_reply(200, r#"{"retcode":0,"payload":{"sessiontoken":"abc"}}"#)
            .with_reply(200, r#"{"retcode":9}"#);
        let (cache, store) = cache(login, clock);

        cache.ensure(true).await.unwrap();
        let failure = cache.ensure(true).await.unwrap_err();

        assert_eq!(failure.retcode, Some(9));
        assert!(!cache.current().is_present());
        assert_eq!(cache.current().expires_at(), None);
        assert_eq!(store.get(keys::AUTH_SESSION_TOKEN), Some(Value::Null));
        assert_eq!(store.get(keys::AUTH_RETCODE), Some(json!(9)));
        assert_eq!(store.get(keys::AUTH_EXPIRES_AT), Some(Value::Null));
    }

    #[tokio::test]
    async fn test_logout_is_local() {
        let clock = Arc::new(ManualClock::default());
        let login =
            ScriptedLogin::new().with_reply(200, r#"{"retcode":0,"payload":{"sessiontoken":"abc"}}"#);
        let calls = login.calls();
        let (cache, store) = cache(login, clock);

        cache.ensure(false).await.unwrap();
        cache.logout();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cache.current().is_present());
        assert_eq!(store.get(keys::AUTH_SESSION_TOKEN), Some(Value::Null));
    }

    #[tokio::test]
    async fn test_transport_error_reports_zero_status() {
        let clock = Arc::new(ManualClock::default());
        let login = ScriptedLogin::new().with_error("connection refused");
        let (cache, _) = cache(login, clock);

        let response = cache.handle(Request::default()).await;
        assert_eq!(response.status_code, 0);
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_write_action_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let (cache, _) = cache(ScriptedLogin::new(), clock);

        let response = cache.handle(Request::with_action(Action::Write)).await;
        assert!(response.is_error());
        assert_eq!(cache.login_calls(), 0);
    }
}
