//! Token-side harness.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use chrono::Duration;
use flowlink::adapter::outbound::state::MemoryStateStore;
use flowlink::application::token::{TokenCache, TokenSettings};
use flowlink::port::StateWriter;
use flowlink::testkit::{ManualClock, RecordingStatusSink, ScriptedLogin};

pub struct TokenHarness {
    pub cache: TokenCache,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStateStore>,
    pub status: Arc<RecordingStatusSink>,
    pub calls: Arc<AtomicU32>,
}

/// Cache with a 60 s skew and a 30 min default lifetime.
pub fn token_harness(login: ScriptedLogin) -> TokenHarness {
    token_harness_with_skew(login, Duration::seconds(60))
}

pub fn token_harness_with_skew(login: ScriptedLogin, skew: Duration) -> TokenHarness {
    let calls = login.calls();
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemoryStateStore::new());
    let status = Arc::new(RecordingStatusSink::new());
    let cache = TokenCache::new(
        Arc::new(login),
        clock.clone(),
        StateWriter::new(store.clone(), "auth"),
        status.clone(),
        TokenSettings {
            skew,
            default_lifetime: Duration::minutes(30),
        },
    );

    TokenHarness {
        cache,
        clock,
        store,
        status,
        calls,
    }
}
