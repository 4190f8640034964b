//! Connection-side harness.

use std::sync::Arc;
use std::time::Duration;

use flowlink::adapter::outbound::state::MemoryStateStore;
use flowlink::application::connection::{ConnectionManager, RequestDispatcher};
use flowlink::application::queue::Subscriber;
use flowlink::domain::event::PointEvent;
use flowlink::domain::point::PointConfig;
use flowlink::infrastructure::bootstrap::{build_connection, ConnectionStack};
use flowlink::infrastructure::config::settings::Config;
use flowlink::testkit::config::ENDPOINT;
use flowlink::testkit::{RecordingStatusSink, ScriptedConnector, SourceTap};

pub struct Harness {
    pub manager: ConnectionManager,
    pub dispatcher: RequestDispatcher,
    pub events: Subscriber<PointEvent>,
    pub tap: Arc<SourceTap>,
    pub store: Arc<MemoryStateStore>,
    pub status: Arc<RecordingStatusSink>,
}

/// Build a manager over `connector` with the given points and reconnect delay.
pub fn harness(connector: ScriptedConnector, points: Vec<PointConfig>, delay: Duration) -> Harness {
    let mut config = Config::default();
    config.endpoint.url = ENDPOINT.to_string();
    config.reconnect.delay_secs = delay.as_secs();
    config.events.capacity = 16;
    config.points = points;

    let tap = connector.tap();
    let store = Arc::new(MemoryStateStore::new());
    let status = Arc::new(RecordingStatusSink::new());
    let ConnectionStack {
        manager,
        dispatcher,
        events,
    } = build_connection(&config, Arc::new(connector), store.clone(), status.clone())
        .expect("valid point configuration");

    Harness {
        manager,
        dispatcher,
        events,
        tap,
        store,
        status,
    }
}
