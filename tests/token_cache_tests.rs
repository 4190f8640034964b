//! Integration tests for the token freshness cache and its poll loop.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use flowlink::application::token::TokenPoller;
use flowlink::domain::request::{Action, Request};
use flowlink::domain::status::StatusKind;
use flowlink::port::{keys, Clock, StateStore};
use flowlink::testkit::ScriptedLogin;
use serde_json::{json, Value};
use tokio::sync::Notify;

use support::settle;
use support::token::{token_harness, token_harness_with_skew};

#[tokio::test]
async fn test_token_reused_inside_skew_margin() {
    let h = token_harness(ScriptedLogin::new().with_token("abc", 120).with_token("def", 120));

    let first = h.cache.ensure(false).await.unwrap();
    assert!(!first.reused);

    h.clock.advance(Duration::seconds(30));
    let reused = h.cache.ensure(false).await.unwrap();
    assert!(reused.reused);
    assert_eq!(reused.token, "abc");
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);

    h.clock.advance(Duration::seconds(35));
    let fresh = h.cache.ensure(false).await.unwrap();
    assert!(!fresh.reused);
    assert_eq!(fresh.token, "def");
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_force_always_logs_in() {
    let h = token_harness(
        ScriptedLogin::new()
            .with_token("abc", 3600)
            .with_token("def", 3600),
    );

    h.cache.ensure(false).await.unwrap();
    let forced = h.cache.ensure(true).await.unwrap();

    assert!(!forced.reused);
    assert_eq!(forced.token, "def");
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_login() {
    let gate = Arc::new(Notify::new());
    let login = ScriptedLogin::new()
        .with_token("abc", 3600)
        .with_gate(gate.clone());
    let h = token_harness(login);

    let first = tokio::spawn({
        let cache = h.cache.clone();
        async move { cache.ensure(false).await }
    });
    let second = tokio::spawn({
        let cache = h.cache.clone();
        async move { cache.ensure(true).await }
    });
    settle().await;
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);

    gate.notify_one();
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(first.token, "abc");
    assert_eq!(second.token, "abc");
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.cache.login_calls(), 1);

    // The guard is released once the shared call completes.
    let next = tokio::spawn({
        let cache = h.cache.clone();
        async move { cache.login().await }
    });
    settle().await;
    gate.notify_one();
    assert!(next.await.unwrap().is_err());
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ttl_login_end_to_end() {
    let h = token_harness_with_skew(
        ScriptedLogin::new().with_reply(200, r#"{"retcode":0,"payload":{"sessiontoken":"abc","ttl":60}}"#),
        Duration::seconds(30),
    );
    let start = h.clock.now();

    let response = h.cache.handle(Request::default()).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(response.payload["reused"], json!(false));

    assert_eq!(h.store.get(keys::AUTH_SESSION_TOKEN), Some(json!("abc")));
    assert_eq!(h.store.get(keys::AUTH_RETCODE), Some(json!(0)));
    assert_eq!(
        h.store.get(keys::AUTH_EXPIRES_AT),
        Some(json!("2024-05-01T12:01:00.000Z"))
    );
    assert_eq!(h.cache.current().expires_at(), Some(start + Duration::seconds(60)));
    assert_eq!(h.cache.settings().skew, Duration::seconds(30));
    assert_eq!(h.cache.settings().default_lifetime, Duration::minutes(30));

    h.clock.advance(Duration::seconds(10));
    let response = h.cache.handle(Request::read("token")).await;

    assert_eq!(response.payload["reused"], json!(true));
    assert_eq!(response.payload["token"], json!("abc"));
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_login_clears_store_and_reports_retcode() {
    let h = token_harness(ScriptedLogin::new().with_reply(200, r#"{"retcode":7}"#));

    let response = h.cache.handle(Request::with_action(Action::Force)).await;

    assert!(response.is_error());
    assert_eq!(response.payload["retcode"], json!(7));
    assert_eq!(h.store.get(keys::AUTH_SESSION_TOKEN), Some(Value::Null));
    assert_eq!(h.store.get(keys::AUTH_EXPIRES_AT), Some(Value::Null));
    assert_eq!(h.store.get(keys::AUTH_RETCODE), Some(json!(7)));
    assert_eq!(h.status.last().unwrap().kind, StatusKind::TokenFailed);
}

#[tokio::test]
async fn test_http_error_status_is_reported() {
    let h = token_harness(ScriptedLogin::new().with_reply(503, "unavailable"));

    let response = h.cache.handle(Request::default()).await;

    assert!(response.is_error());
    assert_eq!(response.status_code, 503);
    assert!(!h.cache.current().is_present());
}

#[tokio::test]
async fn test_logout_action_clears_token() {
    let h = token_harness(ScriptedLogin::new().with_token("abc", 3600));
    h.cache.ensure(false).await.unwrap();

    let response = h.cache.handle(Request::with_action(Action::Logout)).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.payload["token"], Value::Null);
    assert_eq!(h.store.get(keys::AUTH_SESSION_TOKEN), Some(Value::Null));
    assert_eq!(h.store.get(keys::AUTH_RETCODE), Some(Value::Null));
    assert_eq!(h.status.last().unwrap().kind, StatusKind::TokenCleared);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_auth_keys_belong_to_the_cache() {
    let h = token_harness(ScriptedLogin::new().with_token("abc", 3600));
    h.cache.ensure(false).await.unwrap();

    let err = h
        .store
        .set("connection", keys::AUTH_SESSION_TOKEN, json!("forged"))
        .unwrap_err();

    assert!(err.to_string().contains(keys::AUTH_SESSION_TOKEN));
    assert_eq!(h.store.get(keys::AUTH_SESSION_TOKEN), Some(json!("abc")));
}

#[tokio::test(start_paused = true)]
async fn test_poll_reuses_token_and_reports_valid() {
    let h = token_harness(ScriptedLogin::new().with_token("abc", 3600));

    let poller = TokenPoller::spawn(h.cache.clone(), StdDuration::from_secs(10)).unwrap();
    tokio::time::sleep(StdDuration::from_secs(35)).await;
    poller.shutdown().await;

    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.status.count(StatusKind::TokenRefreshed), 1);
    assert_eq!(h.status.count(StatusKind::TokenValid), 3);
}

#[tokio::test(start_paused = true)]
async fn test_poll_survives_failures() {
    let h = token_harness(
        ScriptedLogin::new()
            .with_error("connection refused")
            .with_token("abc", 3600),
    );

    let poller = TokenPoller::spawn(h.cache.clone(), StdDuration::from_secs(10)).unwrap();
    tokio::time::sleep(StdDuration::from_secs(15)).await;

    assert!(!poller.is_stopped());
    assert_eq!(h.status.count(StatusKind::TokenFailed), 1);
    assert_eq!(h.status.count(StatusKind::TokenRefreshed), 1);
    assert_eq!(h.cache.current().value(), Some("abc"));
    poller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stopped_poll_makes_no_more_calls() {
    let h = token_harness(ScriptedLogin::new().with_token("abc", 3600));

    let poller = TokenPoller::spawn(h.cache.clone(), StdDuration::from_secs(10)).unwrap();
    settle().await;
    poller.stop();
    assert!(poller.is_stopped());

    h.clock.advance(Duration::hours(2));
    tokio::time::sleep(StdDuration::from_secs(60)).await;

    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_interval_disables_poll() {
    let h = token_harness(ScriptedLogin::new());

    assert!(TokenPoller::spawn(h.cache.clone(), StdDuration::ZERO).is_none());
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}
