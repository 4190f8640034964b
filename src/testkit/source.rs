//! Scripted point source for testing the connection side.
//!
//! [`ScriptedConnector`] hands out client/session/subscription doubles that
//! pop pre-loaded results (defaulting to success when a script runs out) and
//! record every call on a shared [`SourceTap`]. The tap is also how a
//! test plays the server: it pushes notifications to monitored points and
//! raises link signals.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::domain::id::PointId;
use crate::domain::session::Endpoint;
use crate::domain::value::{PointValue, Sample};
use crate::error::{Error, Result};
use crate::port::{
    LinkSignal, LinkSignals, MonitorRequest, NotificationSink, PointClient, PointConnector,
    PointSession, PointSubscription,
};

/// Call counters, one per remote operation.
#[derive(Debug, Default)]
pub struct SourceCounts {
    pub connects: AtomicU32,
    pub sessions: AtomicU32,
    pub subscriptions: AtomicU32,
    pub monitors: AtomicU32,
    pub reads: AtomicU32,
    pub writes: AtomicU32,
    pub terminations: AtomicU32,
    pub closes: AtomicU32,
    pub disconnects: AtomicU32,
}

#[derive(Default)]
struct Script {
    connect: VecDeque<Result<()>>,
    session: VecDeque<Result<()>>,
    subscription: VecDeque<Result<()>>,
    teardown_fails: bool,
    bad_points: HashSet<PointId>,
    read_failure: Option<String>,
    values: HashMap<PointId, PointValue>,
    write_status: u32,
}

#[derive(Default)]
struct Live {
    signals: Option<LinkSignals>,
    sinks: HashMap<PointId, Arc<dyn NotificationSink>>,
    monitored: Vec<MonitorRequest>,
    written: Vec<(PointId, PointValue)>,
}

/// Shared view of everything the scripted source saw and did.
#[derive(Default)]
pub struct SourceTap {
    counts: SourceCounts,
    script: Mutex<Script>,
    live: Mutex<Live>,
    connect_gate: Mutex<Option<Arc<Notify>>>,
}

impl SourceTap {
    #[must_use]
    pub fn counts(&self) -> &SourceCounts {
        &self.counts
    }

    #[must_use]
    pub fn connects(&self) -> u32 {
        self.counts.connects.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn subscriptions(&self) -> u32 {
        self.counts.subscriptions.load(Ordering::SeqCst)
    }

    /// Every successful monitor request, across all connects, in order.
    #[must_use]
    pub fn monitored(&self) -> Vec<MonitorRequest> {
        self.live.lock().monitored.clone()
    }

    /// Values written so far.
    #[must_use]
    pub fn written(&self) -> Vec<(PointId, PointValue)> {
        self.live.lock().written.clone()
    }

    /// Push a value-change notification to the latest sink for `point_id`.
    ///
    /// Returns false if the point was never monitored.
    pub fn notify(&self, point_id: &str, value: PointValue) -> bool {
        let sink = self.live.lock().sinks.get(&PointId::new(point_id)).cloned();
        match sink {
            Some(sink) => {
                sink.deliver(Sample::new(value, Utc::now()));
                true
            }
            None => false,
        }
    }

    /// Signal channel handed to the most recent connect.
    #[must_use]
    pub fn signals(&self) -> Option<LinkSignals> {
        self.live.lock().signals.clone()
    }

    /// Raise a signal on the most recent link.
    pub fn signal(&self, signal: LinkSignal) -> bool {
        match self.signals() {
            Some(signals) => {
                signals.send(signal);
                true
            }
            None => false,
        }
    }

    pub fn set_value(&self, point_id: &str, value: PointValue) {
        self.script
            .lock()
            .values
            .insert(PointId::new(point_id), value);
    }

    /// Make every read fail with a transport error; `None` restores reads.
    pub fn set_read_failure(&self, reason: Option<&str>) {
        self.script.lock().read_failure = reason.map(str::to_string);
    }

    pub fn set_write_status(&self, status: u32) {
        self.script.lock().write_status = status;
    }

    /// Queue another connect result.
    pub fn push_connect_result(&self, result: Result<()>) {
        self.script.lock().connect.push_back(result);
    }
}

/// Scripted [`PointConnector`].
pub struct ScriptedConnector {
    tap: Arc<SourceTap>,
}

impl Default for ScriptedConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConnector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tap: Arc::new(SourceTap::default()),
        }
    }

    #[must_use]
    pub fn with_connect_results(self, results: Vec<Result<()>>) -> Self {
        self.tap.script.lock().connect = results.into();
        self
    }

    #[must_use]
    pub fn with_session_results(self, results: Vec<Result<()>>) -> Self {
        self.tap.script.lock().session = results.into();
        self
    }

    #[must_use]
    pub fn with_subscription_results(self, results: Vec<Result<()>>) -> Self {
        self.tap.script.lock().subscription = results.into();
        self
    }

    /// Points whose monitor request fails.
    #[must_use]
    pub fn with_bad_points(self, point_ids: &[&str]) -> Self {
        self.tap.script.lock().bad_points = point_ids.iter().map(|p| PointId::new(*p)).collect();
        self
    }

    /// Make every teardown step fail.
    #[must_use]
    pub fn with_failing_teardown(self) -> Self {
        self.tap.script.lock().teardown_fails = true;
        self
    }

    /// Hold every connect until the gate is notified.
    #[must_use]
    pub fn with_connect_gate(self, gate: Arc<Notify>) -> Self {
        *self.tap.connect_gate.lock() = Some(gate);
        self
    }

    #[must_use]
    pub fn tap(&self) -> Arc<SourceTap> {
        self.tap.clone()
    }
}

/// A failed remote step, as the protocol library would report it.
#[must_use]
pub fn fail(stage: &'static str) -> Result<()> {
    Err(Error::transport(stage, "scripted failure"))
}

fn next(queue: &mut VecDeque<Result<()>>) -> Result<()> {
    queue.pop_front().unwrap_or(Ok(()))
}

fn teardown_result(tap: &SourceTap, stage: &'static str) -> Result<()> {
    if tap.script.lock().teardown_fails {
        fail(stage)
    } else {
        Ok(())
    }
}

#[async_trait]
impl PointConnector for ScriptedConnector {
    async fn connect(
        &self,
        _endpoint: &Endpoint,
        signals: LinkSignals,
    ) -> Result<Arc<dyn PointClient>> {
        self.tap.counts.connects.fetch_add(1, Ordering::SeqCst);
        // Recorded before the gate so a test can raise signals mid-attempt.
        self.tap.live.lock().signals = Some(signals);
        let gate = self.tap.connect_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let result = next(&mut self.tap.script.lock().connect);
        result?;
        Ok(Arc::new(ScriptedClient {
            tap: self.tap.clone(),
        }))
    }
}

struct ScriptedClient {
    tap: Arc<SourceTap>,
}

#[async_trait]
impl PointClient for ScriptedClient {
    async fn create_session(&self) -> Result<Arc<dyn PointSession>> {
        self.tap.counts.sessions.fetch_add(1, Ordering::SeqCst);
        let result = next(&mut self.tap.script.lock().session);
        result?;
        Ok(Arc::new(ScriptedSession {
            tap: self.tap.clone(),
        }))
    }

    async fn disconnect(&self) -> Result<()> {
        self.tap.counts.disconnects.fetch_add(1, Ordering::SeqCst);
        teardown_result(&self.tap, "disconnect")
    }
}

struct ScriptedSession {
    tap: Arc<SourceTap>,
}

#[async_trait]
impl PointSession for ScriptedSession {
    async fn create_subscription(
        &self,
        _publishing_interval: Duration,
    ) -> Result<Arc<dyn PointSubscription>> {
        self.tap.counts.subscriptions.fetch_add(1, Ordering::SeqCst);
        let result = next(&mut self.tap.script.lock().subscription);
        result?;
        Ok(Arc::new(ScriptedSubscription {
            tap: self.tap.clone(),
        }))
    }

    async fn read(&self, point_id: &PointId) -> Result<Sample> {
        self.tap.counts.reads.fetch_add(1, Ordering::SeqCst);
        let script = self.tap.script.lock();
        if let Some(reason) = &script.read_failure {
            return Err(Error::transport("read", reason.clone()));
        }
        let value = script.values.get(point_id).cloned().unwrap_or(PointValue::Null);
        Ok(Sample::new(value, Utc::now()))
    }

    async fn write(&self, point_id: &PointId, value: &PointValue) -> Result<u32> {
        self.tap.counts.writes.fetch_add(1, Ordering::SeqCst);
        self.tap
            .live
            .lock()
            .written
            .push((point_id.clone(), value.clone()));
        let mut script = self.tap.script.lock();
        script.values.insert(point_id.clone(), value.clone());
        Ok(script.write_status)
    }

    async fn close(&self) -> Result<()> {
        self.tap.counts.closes.fetch_add(1, Ordering::SeqCst);
        teardown_result(&self.tap, "close session")
    }
}

struct ScriptedSubscription {
    tap: Arc<SourceTap>,
}

#[async_trait]
impl PointSubscription for ScriptedSubscription {
    async fn monitor(
        &self,
        request: MonitorRequest,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<()> {
        if self.tap.script.lock().bad_points.contains(&request.point_id) {
            return Err(Error::transport("monitor", format!("bad node id {}", request.point_id)));
        }
        self.tap.counts.monitors.fetch_add(1, Ordering::SeqCst);
        let mut live = self.tap.live.lock();
        live.sinks.insert(request.point_id.clone(), sink);
        live.monitored.push(request);
        Ok(())
    }

    async fn terminate(&self) -> Result<()> {
        self.tap.counts.terminations.fetch_add(1, Ordering::SeqCst);
        teardown_result(&self.tap, "terminate subscription")
    }
}
