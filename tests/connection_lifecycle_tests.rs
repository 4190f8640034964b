//! Integration tests for the connection lifecycle.
//!
//! Timer-driven behavior runs on a paused clock: sleeping in the test
//! auto-advances time, so reconnect delays complete instantly.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use flowlink::domain::session::{Phase, SessionState};
use flowlink::domain::status::StatusKind;
use flowlink::domain::value::PointValue;
use flowlink::port::{LinkSignal, StateStore};
use flowlink::testkit::config::{int_point, points};
use flowlink::testkit::source::fail;
use flowlink::testkit::ScriptedConnector;
use serde_json::json;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

use support::connection::harness;
use support::settle;

const DELAY: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn test_connect_failure_then_reconnect_after_delay() {
    let connector = ScriptedConnector::new().with_connect_results(vec![fail("connect")]);
    let h = harness(connector, vec![int_point()], DELAY);

    assert_err!(h.manager.start().await);
    assert_eq!(h.manager.phase(), Phase::ReconnectPending);
    assert_eq!(h.tap.connects(), 1);

    tokio::time::sleep(DELAY + Duration::from_secs(1)).await;

    assert_eq!(h.manager.phase(), Phase::Active);
    assert_eq!(
        h.status.kinds(),
        vec![
            StatusKind::Connecting,
            StatusKind::Degraded,
            StatusKind::Reconnecting,
            StatusKind::Connecting,
            StatusKind::Connected,
        ]
    );
    assert_eq!(h.tap.connects(), 2);
    assert_eq!(h.tap.subscriptions(), 1);
    let monitored = h.tap.monitored();
    assert_eq!(monitored.len(), 1);
    assert_eq!(monitored[0].point_id.as_str(), "ns=1;s=X");
    assert!(monitored[0].discard_oldest);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_not_attempted_before_delay() {
    let connector = ScriptedConnector::new().with_connect_results(vec![fail("connect")]);
    let h = harness(connector, vec![int_point()], DELAY);

    let _ = h.manager.start().await;
    tokio::time::sleep(DELAY - Duration::from_secs(1)).await;

    assert_eq!(h.tap.connects(), 1);
    assert!(h.manager.reconnect_pending());
}

#[tokio::test(start_paused = true)]
async fn test_schedule_reconnect_twice_yields_one_attempt() {
    let h = harness(ScriptedConnector::new(), vec![int_point()], DELAY);

    assert!(h.manager.schedule_reconnect("notification stream ended"));
    assert!(!h.manager.schedule_reconnect("connection lost"));

    tokio::time::sleep(DELAY * 3).await;

    assert_eq!(h.tap.connects(), 1);
    assert_eq!(h.status.count(StatusKind::Reconnecting), 1);
    assert_eq!(h.manager.phase(), Phase::Active);
}

#[tokio::test(start_paused = true)]
async fn test_both_link_signals_trigger_a_single_reconnect() {
    let h = harness(ScriptedConnector::new(), vec![int_point()], DELAY);
    assert_ok!(h.manager.start().await);

    h.tap.signal(LinkSignal::SubscriptionTerminated {
        reason: "status change".into(),
    });
    h.tap.signal(LinkSignal::ConnectionLost {
        reason: "socket closed".into(),
    });
    settle().await;

    assert_eq!(h.manager.phase(), Phase::ReconnectPending);
    assert_eq!(h.status.count(StatusKind::Degraded), 1);
    assert_eq!(h.status.count(StatusKind::Reconnecting), 1);

    tokio::time::sleep(DELAY + Duration::from_secs(1)).await;

    assert_eq!(h.tap.connects(), 2);
    assert_eq!(h.manager.phase(), Phase::Active);
    // The failed link was torn down before reconnecting.
    let counts = h.tap.counts();
    assert_eq!(counts.terminations.load(Ordering::SeqCst), 1);
    assert_eq!(counts.closes.load(Ordering::SeqCst), 1);
    assert_eq!(counts.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_signal_from_stale_link_is_ignored() {
    let h = harness(ScriptedConnector::new(), vec![int_point()], DELAY);
    assert_ok!(h.manager.start().await);
    let old_signals = h.tap.signals().unwrap();

    assert_ok!(h.manager.force_reconnect().await);
    old_signals.send(LinkSignal::ConnectionLost {
        reason: "late report".into(),
    });
    settle().await;

    assert_eq!(h.manager.phase(), Phase::Active);
    assert_eq!(h.status.count(StatusKind::Degraded), 0);
    assert_eq!(h.tap.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_bad_point_does_not_block_the_rest() {
    let connector = ScriptedConnector::new().with_bad_points(&["ns=1;s=P1"]);
    let h = harness(connector, points(3), DELAY);

    assert_ok!(h.manager.start().await);

    assert_eq!(h.manager.phase(), Phase::Active);
    let ids: Vec<_> = h
        .tap
        .monitored()
        .iter()
        .map(|m| m.point_id.to_string())
        .collect();
    assert_eq!(ids, vec!["ns=1;s=P0", "ns=1;s=P2"]);
    assert_eq!(h.status.last().unwrap().text, "connected (2 points)");
}

#[tokio::test(start_paused = true)]
async fn test_notification_updates_store_and_event_stream() {
    let mut h = harness(
        ScriptedConnector::new(),
        vec![flowlink::domain::point::PointConfig::new("ns=1;s=T").with_topic("temp")],
        DELAY,
    );
    assert_ok!(h.manager.start().await);

    assert!(h.tap.notify("ns=1;s=T", PointValue::Int32(42)));

    assert_eq!(h.store.get("temp"), Some(json!(42)));
    let event = h.events.try_recv().unwrap();
    let message = event.to_message();
    assert_eq!(message.topic, "temp");
    assert_eq!(message.point_id, "ns=1;s=T");
    assert_eq!(message.payload, json!(42));
    assert_eq!(
        h.manager
            .registry()
            .get("temp")
            .unwrap()
            .last_value()
            .cloned(),
        Some(PointValue::Int32(42))
    );
}

#[tokio::test(start_paused = true)]
async fn test_notifications_after_failure_are_dropped() {
    let mut h = harness(ScriptedConnector::new(), vec![int_point()], DELAY);
    assert_ok!(h.manager.start().await);

    h.tap.signal(LinkSignal::ConnectionLost {
        reason: "socket closed".into(),
    });
    settle().await;
    h.tap.notify("ns=1;s=X", PointValue::Int32(7));

    assert_eq!(h.store.get("t1"), None);
    assert!(h.events.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_is_best_effort_and_leaves_disconnected() {
    let connector = ScriptedConnector::new().with_failing_teardown();
    let h = harness(connector, vec![int_point()], DELAY);
    assert_ok!(h.manager.start().await);

    h.manager.cleanup().await;

    let counts = h.tap.counts();
    assert_eq!(counts.terminations.load(Ordering::SeqCst), 1);
    assert_eq!(counts.closes.load(Ordering::SeqCst), 1);
    assert_eq!(counts.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(h.manager.phase(), Phase::Disconnected);
    assert_eq!(h.manager.session().state, SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_connect_is_safe() {
    let h = harness(ScriptedConnector::new(), vec![int_point()], DELAY);

    h.manager.stop().await;
    h.manager.stop().await;

    assert_eq!(h.manager.phase(), Phase::Stopped);
    assert_eq!(h.status.kinds(), vec![StatusKind::Stopped]);
    assert!(h.manager.connect().await.is_err());
    assert_eq!(h.tap.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_reconnect() {
    let connector = ScriptedConnector::new().with_connect_results(vec![fail("connect")]);
    let h = harness(connector, vec![int_point()], DELAY);
    let _ = h.manager.start().await;
    assert!(h.manager.reconnect_pending());

    h.manager.stop().await;
    tokio::time::sleep(DELAY * 3).await;

    assert_eq!(h.tap.connects(), 1);
    assert_eq!(h.manager.phase(), Phase::Stopped);
    assert!(!h.manager.schedule_reconnect("late signal"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_attempt_does_not_reactivate() {
    let gate = Arc::new(Notify::new());
    let connector = ScriptedConnector::new().with_connect_gate(gate.clone());
    let h = harness(connector, vec![int_point()], DELAY);

    let manager = h.manager.clone();
    let attempt = tokio::spawn(async move { manager.connect().await });
    settle().await;
    assert_eq!(h.tap.connects(), 1);

    h.manager.stop().await;
    gate.notify_one();
    let result = attempt.await.unwrap();

    assert_err!(result);
    assert_eq!(h.manager.phase(), Phase::Stopped);
    // The client that arrived after stop was released again.
    let counts = h.tap.counts();
    assert_eq!(counts.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(counts.sessions.load(Ordering::SeqCst), 0);
    assert_eq!(h.status.count(StatusKind::Connected), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_reported_during_attempt_is_applied_afterwards() {
    let gate = Arc::new(Notify::new());
    let connector = ScriptedConnector::new().with_connect_gate(gate.clone());
    let h = harness(connector, vec![int_point()], DELAY);

    let manager = h.manager.clone();
    let attempt = tokio::spawn(async move { manager.connect().await });
    settle().await;

    assert!(!h.manager.schedule_reconnect("connection lost mid-handshake"));
    gate.notify_one();
    let result = attempt.await.unwrap();

    assert_err!(result);
    assert_eq!(h.manager.phase(), Phase::ReconnectPending);
    assert_eq!(h.status.count(StatusKind::Connected), 0);
    assert_eq!(h.status.count(StatusKind::Reconnecting), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_delay_disables_reconnect() {
    let connector = ScriptedConnector::new().with_connect_results(vec![fail("connect")]);
    let h = harness(connector, vec![int_point()], Duration::ZERO);

    let _ = h.manager.start().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(h.tap.connects(), 1);
    assert_eq!(h.manager.phase(), Phase::Degraded);
    assert_eq!(h.status.count(StatusKind::Reconnecting), 0);
    // Without a reconnect the failure is terminal.
    assert_eq!(h.store.get("t1"), Some(json!(null)));
}

#[tokio::test(start_paused = true)]
async fn test_session_record_is_rebuilt_on_reconnect() {
    let connector = ScriptedConnector::new().with_session_results(vec![fail("create session")]);
    let h = harness(connector, vec![int_point()], DELAY);

    let _ = h.manager.start().await;
    let degraded = h.manager.session();
    assert_eq!(degraded.state, SessionState::Degraded);
    assert!(degraded.last_error.unwrap().contains("create session"));

    tokio::time::sleep(DELAY + Duration::from_secs(1)).await;

    let active = h.manager.session();
    assert_eq!(active.state, SessionState::Active);
    assert_eq!(active.last_error, None);
    assert_eq!(active.endpoint, flowlink::testkit::config::ENDPOINT);
    // The client from the failed attempt was released.
    assert_eq!(h.tap.counts().disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_signals_handled_without_start() {
    let h = harness(ScriptedConnector::new(), vec![int_point()], DELAY);
    assert_ok!(h.manager.connect().await);

    h.tap.signal(LinkSignal::ConnectionLost {
        reason: "socket closed".into(),
    });
    tokio::time::sleep(DELAY * 2).await;

    assert_eq!(h.tap.connects(), 2);
    assert_eq!(h.manager.phase(), Phase::Active);
    assert_eq!(h.status.count(StatusKind::Degraded), 1);
}

#[tokio::test(start_paused = true)]
async fn test_link_signal_during_attempt_is_deferred() {
    let gate = Arc::new(Notify::new());
    let connector = ScriptedConnector::new().with_connect_gate(gate.clone());
    let h = harness(connector, vec![int_point()], DELAY);

    let manager = h.manager.clone();
    let attempt = tokio::spawn(async move { manager.connect().await });
    settle().await;
    assert!(h.tap.signal(LinkSignal::ConnectionLost {
        reason: "reset during handshake".into(),
    }));
    settle().await;
    assert_eq!(h.manager.phase(), Phase::Connecting);

    gate.notify_one();
    assert_err!(attempt.await.unwrap());

    assert_eq!(h.manager.phase(), Phase::ReconnectPending);
    assert_eq!(h.status.count(StatusKind::Connected), 0);
    assert_eq!(h.status.count(StatusKind::Degraded), 1);
    assert_eq!(h.status.count(StatusKind::Reconnecting), 1);
    // The deferred failure tore the new link down.
    assert_eq!(h.tap.counts().disconnects.load(Ordering::SeqCst), 1);

    gate.notify_one();
    tokio::time::sleep(DELAY + Duration::from_secs(1)).await;
    assert_eq!(h.manager.phase(), Phase::Active);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_requested_while_active_stops_delivery() {
    let h = harness(ScriptedConnector::new(), vec![int_point()], DELAY);
    assert_ok!(h.manager.start().await);

    assert!(h.manager.schedule_reconnect("operator request"));
    h.tap.notify("ns=1;s=X", PointValue::Int32(9));

    assert_eq!(h.manager.phase(), Phase::ReconnectPending);
    assert_eq!(h.manager.session().state, SessionState::Degraded);
    assert_eq!(h.store.get("t1"), None);
}

#[tokio::test(start_paused = true)]
async fn test_stop_clears_point_values() {
    let h = harness(
        ScriptedConnector::new(),
        vec![flowlink::domain::point::PointConfig::new("ns=1;s=T").with_topic("temp")],
        DELAY,
    );
    assert_ok!(h.manager.start().await);
    assert!(h.tap.notify("ns=1;s=T", PointValue::Int32(42)));
    assert_eq!(h.store.get("temp"), Some(json!(42)));

    h.manager.stop().await;
    h.tap.notify("ns=1;s=T", PointValue::Int32(43));

    assert_eq!(h.store.get("temp"), Some(json!(null)));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_clears_point_values() {
    let h = harness(ScriptedConnector::new(), vec![int_point()], DELAY);
    assert_ok!(h.manager.start().await);
    assert!(h.tap.notify("ns=1;s=X", PointValue::Int32(5)));

    h.manager.disconnect().await;

    assert_eq!(h.store.get("t1"), Some(json!(null)));
    assert_eq!(h.manager.phase(), Phase::Disconnected);
}
