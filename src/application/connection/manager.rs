//! Connection lifecycle manager.
//!
//! Drives `Disconnected → Connecting → SubscriptionSetup → Active` against the
//! remote point source. Any failure tears the link down, reports the
//! manager as degraded and arms a single fixed-delay reconnect timer.
//!
//! # Invariants
//!
//! - At most one reconnect is pending at a time; further requests are
//!   absorbed by the transition table in [`Phase::on_reconnect_request`].
//! - A reconnect never starts while a connect attempt is in flight. Failures
//!   reported during an attempt are applied when the attempt completes.
//! - Every attempt gets a fresh generation number. Resources, signals and
//!   notifications from an older generation never touch current state.
//! - Once [`stop`](ConnectionManager::stop) has set the stopping flag, nothing
//!   reactivates the manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::registry::SubscriptionRegistry;
use crate::domain::session::{Endpoint, Phase, ReconnectDecision, Session, SessionState};
use crate::domain::status::Status;
use crate::error::{Error, Result};
use crate::port::{
    LinkSignal, LinkSignals, MonitorRequest, PointClient, PointConnector, PointSession,
    PointSubscription, StatusSink,
};

/// Settings for one manager instance.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub endpoint: Endpoint,
    /// Fixed delay before a reconnect; zero disables automatic reconnects.
    pub reconnect_delay: Duration,
    pub publishing_interval: Duration,
    /// Per-point notification buffer requested from the server.
    pub queue_size: u32,
}

impl ConnectionSettings {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            reconnect_delay: Duration::from_secs(5),
            publishing_interval: Duration::from_millis(1000),
            queue_size: 10,
        }
    }
}

/// Remote resources of one connect attempt, torn down in reverse order.
#[derive(Default)]
struct Link {
    client: Option<Arc<dyn PointClient>>,
    session: Option<Arc<dyn PointSession>>,
    subscription: Option<Arc<dyn PointSubscription>>,
}

impl Link {
    fn is_empty(&self) -> bool {
        self.client.is_none() && self.session.is_none() && self.subscription.is_none()
    }
}

struct Lifecycle {
    phase: Phase,
    generation: u64,
    link: Link,
    session: Session,
    reconnect_timer: Option<JoinHandle<()>>,
    /// Failure reported while an attempt was in flight.
    deferred_failure: Option<String>,
    subscribed: usize,
}

/// Where a failure was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// The connect attempt itself failed.
    Attempt,
    /// The client or subscription reported the link as gone.
    Link,
}

enum Begin {
    Started { generation: u64, leftovers: Link },
    InFlight,
    Stopping,
}

struct Inner {
    connector: Arc<dyn PointConnector>,
    registry: Arc<SubscriptionRegistry>,
    settings: ConnectionSettings,
    status: Arc<dyn StatusSink>,
    stopping: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    signal_tx: mpsc::UnboundedSender<(u64, LinkSignal)>,
    signal_rx: Mutex<Option<mpsc::UnboundedReceiver<(u64, LinkSignal)>>>,
    signal_task: Mutex<Option<JoinHandle<()>>>,
}

/// Keeps a session and its subscriptions alive against an unreliable network.
///
/// Cheap to clone; all clones drive the same lifecycle.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn PointConnector>,
        registry: Arc<SubscriptionRegistry>,
        settings: ConnectionSettings,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let session = Session::disconnected(&settings.endpoint);
        Self {
            inner: Arc::new(Inner {
                connector,
                registry,
                settings,
                status,
                stopping: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle {
                    phase: Phase::Disconnected,
                    generation: 0,
                    link: Link::default(),
                    session,
                    reconnect_timer: None,
                    deferred_failure: None,
                    subscribed: 0,
                }),
                signal_tx,
                signal_rx: Mutex::new(Some(signal_rx)),
                signal_task: Mutex::new(None),
            }),
        }
    }

    /// Make the first connect attempt.
    ///
    /// # Errors
    ///
    /// Returns the first attempt's failure; a reconnect is already scheduled
    /// by then.
    pub async fn start(&self) -> Result<()> {
        self.connect().await
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.lifecycle.lock().phase
    }

    /// Snapshot of the current session record.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.lifecycle.lock().session.clone()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.inner.stopping.load(Ordering::SeqCst)
    }

    /// True while a reconnect timer is armed.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.phase() == Phase::ReconnectPending
    }

    /// Establish a session and subscribe every configured point.
    ///
    /// A point that cannot be monitored is logged and skipped. Any other
    /// failure degrades the manager and schedules a reconnect. Calling this
    /// while an attempt is already running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the attempt.
    pub async fn connect(&self) -> Result<()> {
        let (generation, leftovers) = match self.begin_attempt() {
            Begin::Started {
                generation,
                leftovers,
            } => (generation, leftovers),
            Begin::InFlight => {
                debug!("Connect attempt already in flight");
                return Ok(());
            }
            Begin::Stopping => {
                return Err(Error::NotConnected {
                    phase: Phase::Stopped,
                })
            }
        };
        self.spawn_signal_listener();

        if !leftovers.is_empty() {
            teardown(leftovers).await;
        }

        let endpoint = &self.inner.settings.endpoint;
        info!(endpoint = %endpoint.url, generation, "Connecting");
        self.emit(Status::connecting(&endpoint.url));

        match self.establish(generation).await {
            Ok(subscribed) => self.finish_attempt(generation, subscribed).await,
            Err(e) => {
                self.handle_failure(generation, e.to_string(), Origin::Attempt)
                    .await;
                Err(e)
            }
        }
    }

    /// Arm the reconnect timer unless one is already pending.
    ///
    /// Safe to call from any number of trigger sources; only the first call
    /// in a failure episode arms a timer. Returns true if this call armed it.
    pub fn schedule_reconnect(&self, reason: &str) -> bool {
        if self.is_stopping() {
            return false;
        }
        let armed = self.arm_reconnect(&mut self.inner.lifecycle.lock(), reason);
        if armed {
            self.announce_reconnect(reason);
        }
        armed
    }

    /// Tear down subscription, session and client, in that order.
    ///
    /// Each step is best-effort. Leaves the manager `Disconnected` (or
    /// `Stopped` once stopping) and invalidates any attempt in flight.
    pub async fn cleanup(&self) {
        let link = {
            let mut lifecycle = self.inner.lifecycle.lock();
            self.inner.registry.close();
            lifecycle.generation += 1;
            lifecycle.subscribed = 0;
            if lifecycle.phase != Phase::Stopped {
                lifecycle.phase = Phase::Disconnected;
            }
            lifecycle.session.state = SessionState::Disconnected;
            std::mem::take(&mut lifecycle.link)
        };
        teardown(link).await;
    }

    /// Drop the link on request, without scheduling a reconnect.
    ///
    /// Point values in the state store are set to null.
    pub async fn disconnect(&self) {
        self.cancel_timer();
        self.cleanup().await;
        self.inner.registry.clear_values();
        if !self.is_stopping() {
            info!("Disconnected on request");
            self.emit(Status::disconnected());
        }
    }

    /// Tear down and reconnect immediately, cancelling any pending timer.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the attempt.
    pub async fn force_reconnect(&self) -> Result<()> {
        self.cancel_timer();
        self.connect().await
    }

    /// Terminal shutdown. Safe to call at any time, including before any
    /// successful connect, and more than once.
    pub async fn stop(&self) {
        // Set first so scheduled and in-flight work observes it.
        if self.inner.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel_timer();
        if let Some(task) = self.inner.signal_task.lock().take() {
            task.abort();
        }

        self.cleanup().await;
        self.inner.registry.clear_values();
        self.inner.lifecycle.lock().phase = Phase::Stopped;

        info!("Connection manager stopped");
        self.emit(Status::stopped());
    }

    /// The session requests run against; only available while `Active`.
    pub(crate) fn active_session(&self) -> Result<Arc<dyn PointSession>> {
        let lifecycle = self.inner.lifecycle.lock();
        match (lifecycle.phase, &lifecycle.link.session) {
            (Phase::Active, Some(session)) => Ok(session.clone()),
            (phase, _) => Err(Error::NotConnected { phase }),
        }
    }

    /// Record a request-level transport failure on the session.
    pub(crate) fn mark_degraded(&self, reason: &str) {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if lifecycle.phase != Phase::Active {
                return;
            }
            lifecycle.session.state = SessionState::Degraded;
            lifecycle.session.last_error = Some(reason.to_string());
        }
        self.emit(Status::degraded(reason));
    }

    /// Clear a request-level degradation after a successful request.
    pub(crate) fn mark_healthy(&self) {
        let subscribed = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if lifecycle.phase != Phase::Active
                || lifecycle.session.state != SessionState::Degraded
            {
                return;
            }
            lifecycle.session.state = SessionState::Active;
            lifecycle.subscribed
        };
        self.emit(Status::connected(subscribed));
    }

    fn emit(&self, status: Status) {
        self.inner.status.emit(status);
    }

    fn cancel_timer(&self) {
        let timer = self.inner.lifecycle.lock().reconnect_timer.take();
        if let Some(timer) = timer {
            timer.abort();
        }
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.phase == Phase::ReconnectPending {
            lifecycle.phase = Phase::Degraded;
        }
    }

    fn begin_attempt(&self) -> Begin {
        if self.is_stopping() {
            return Begin::Stopping;
        }
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.phase == Phase::Stopped {
            return Begin::Stopping;
        }
        if lifecycle.phase.is_attempting() {
            return Begin::InFlight;
        }

        self.inner.registry.close();
        lifecycle.generation += 1;
        lifecycle.phase = Phase::Connecting;
        lifecycle.session = Session::disconnected(&self.inner.settings.endpoint);
        lifecycle.session.state = SessionState::Connecting;
        lifecycle.deferred_failure = None;
        lifecycle.subscribed = 0;
        Begin::Started {
            generation: lifecycle.generation,
            leftovers: std::mem::take(&mut lifecycle.link),
        }
    }

    /// Run the remote half of an attempt; returns how many points were
    /// subscribed.
    async fn establish(&self, generation: u64) -> Result<usize> {
        let settings = &self.inner.settings;
        let signals = LinkSignals::new(generation, self.inner.signal_tx.clone());

        let client = self
            .inner
            .connector
            .connect(&settings.endpoint, signals)
            .await?;
        if !self.install(generation, |link| link.client = Some(client.clone())) {
            best_effort("disconnect", client.disconnect()).await;
            return Err(superseded());
        }

        let session = client.create_session().await?;
        let installed = self.install(generation, |link| link.session = Some(session.clone()));
        if !installed {
            best_effort("close session", session.close()).await;
            return Err(superseded());
        }
        self.set_phase(generation, Phase::SubscriptionSetup);

        let subscription = session
            .create_subscription(settings.publishing_interval)
            .await?;
        let installed = self.install(generation, |link| {
            link.subscription = Some(subscription.clone());
        });
        if !installed {
            best_effort("terminate subscription", subscription.terminate()).await;
            return Err(superseded());
        }

        let registry = &self.inner.registry;
        let mut subscribed = 0;
        for (index, point) in registry.points().iter().enumerate() {
            if !self.is_current(generation) {
                return Err(superseded());
            }
            let request = MonitorRequest {
                point_id: point.point_id().clone(),
                sampling_interval: point.sampling_interval(),
                queue_size: settings.queue_size,
                discard_oldest: true,
            };
            match subscription
                .monitor(request, registry.sink(index, generation))
                .await
            {
                Ok(()) => {
                    subscribed += 1;
                    debug!(topic = %point.topic(), point_id = %point.point_id(), "Monitoring point");
                }
                Err(e) => {
                    warn!(
                        topic = %point.topic(),
                        point_id = %point.point_id(),
                        error = %e,
                        "Failed to monitor point, skipping"
                    );
                }
            }
        }

        Ok(subscribed)
    }

    async fn finish_attempt(&self, generation: u64, subscribed: usize) -> Result<()> {
        let deferred = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if self.is_stopping() || lifecycle.generation != generation {
                return Err(superseded());
            }
            match lifecycle.deferred_failure.take() {
                Some(reason) => Some(reason),
                None => {
                    lifecycle.phase = Phase::Active;
                    lifecycle.session.state = SessionState::Active;
                    lifecycle.session.last_error = None;
                    lifecycle.subscribed = subscribed;
                    self.inner.registry.accept(generation);
                    None
                }
            }
        };

        if let Some(reason) = deferred {
            self.handle_failure(generation, reason.clone(), Origin::Attempt)
                .await;
            return Err(Error::transport("session", reason));
        }

        let total = self.inner.registry.len();
        info!(subscribed, total, "Connected");
        self.emit(Status::connected(subscribed));
        Ok(())
    }

    /// Degrade, tear down the failed link and schedule a reconnect.
    ///
    /// The phase decision and the timer are made under one lock. A link
    /// failure reported while an attempt is in flight is only recorded; the
    /// attempt applies it when it completes.
    async fn handle_failure(&self, generation: u64, reason: String, origin: Origin) {
        let (link, armed) = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if self.is_stopping() {
                return;
            }
            if lifecycle.generation != generation {
                debug!(generation, reason = %reason, "Ignoring failure from stale link");
                return;
            }
            let link = match (origin, lifecycle.phase) {
                (Origin::Link, phase) if phase.is_attempting() => {
                    debug!(reason = %reason, "Attempt in flight, deferring link failure");
                    lifecycle
                        .deferred_failure
                        .get_or_insert_with(|| reason.clone());
                    return;
                }
                (_, Phase::Connecting | Phase::SubscriptionSetup | Phase::Active) => {
                    self.inner.registry.close();
                    lifecycle.phase = Phase::Degraded;
                    lifecycle.session.state = SessionState::Degraded;
                    lifecycle.session.last_error = Some(reason.clone());
                    lifecycle.subscribed = 0;
                    Some(std::mem::take(&mut lifecycle.link))
                }
                _ => None,
            };
            (link, self.arm_reconnect(&mut lifecycle, &reason))
        };

        if link.is_some() {
            error!(reason = %reason, "Connection degraded");
            self.emit(Status::degraded(&reason));
        }
        if armed {
            self.announce_reconnect(&reason);
        }
        if let Some(link) = link {
            teardown(link).await;
        }
    }

    /// Apply the reconnect transition table; returns true if a timer was armed.
    fn arm_reconnect(&self, lifecycle: &mut Lifecycle, reason: &str) -> bool {
        if self.is_stopping() {
            return false;
        }
        let delay = self.inner.settings.reconnect_delay;
        match lifecycle.phase.on_reconnect_request() {
            ReconnectDecision::AlreadyPending => {
                debug!(reason, "Reconnect already pending");
                false
            }
            ReconnectDecision::AttemptInFlight => {
                debug!(reason, "Attempt in flight, deferring failure");
                lifecycle
                    .deferred_failure
                    .get_or_insert_with(|| reason.to_string());
                false
            }
            ReconnectDecision::Stopping => false,
            ReconnectDecision::Schedule if delay.is_zero() => {
                if lifecycle.phase == Phase::Degraded {
                    // No reconnect will follow, so the failure is terminal.
                    warn!(reason, "Automatic reconnect disabled, clearing point values");
                    self.inner.registry.clear_values();
                } else {
                    warn!(reason, "Automatic reconnect disabled");
                }
                false
            }
            ReconnectDecision::Schedule => {
                if lifecycle.phase == Phase::Active {
                    // The link is replaced by the next attempt; stop
                    // delivering from it now.
                    self.inner.registry.close();
                    lifecycle.subscribed = 0;
                    lifecycle.session.last_error = Some(reason.to_string());
                }
                lifecycle.phase = Phase::ReconnectPending;
                lifecycle.session.state = SessionState::Degraded;
                let manager = self.clone();
                lifecycle.reconnect_timer = Some(tokio::spawn(async move {
                    sleep(delay).await;
                    manager.reconnect_due().await;
                }));
                true
            }
        }
    }

    fn announce_reconnect(&self, reason: &str) {
        let delay = self.inner.settings.reconnect_delay;
        info!(delay_secs = delay.as_secs(), reason, "Reconnect scheduled");
        self.emit(Status::reconnecting(delay.as_secs(), reason));
    }

    async fn reconnect_due(&self) {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            // Our own handle; the task is already running.
            lifecycle.reconnect_timer = None;
            if self.is_stopping() || lifecycle.phase != Phase::ReconnectPending {
                return;
            }
        }
        if let Err(e) = self.connect().await {
            debug!(error = %e, "Reconnect attempt failed");
        }
    }

    fn spawn_signal_listener(&self) {
        let Some(mut rx) = self.inner.signal_rx.lock().take() else {
            return;
        };
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some((generation, signal)) = rx.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let manager = ConnectionManager { inner };
                if manager.is_stopping() {
                    break;
                }
                warn!(generation, ?signal, "Link signal received");
                manager
                    .handle_failure(generation, signal.reason().to_string(), Origin::Link)
                    .await;
            }
        });
        *self.inner.signal_task.lock() = Some(task);
    }

    fn install(&self, generation: u64, apply: impl FnOnce(&mut Link)) -> bool {
        let mut lifecycle = self.inner.lifecycle.lock();
        if self.is_stopping() || lifecycle.generation != generation {
            return false;
        }
        apply(&mut lifecycle.link);
        true
    }

    fn set_phase(&self, generation: u64, phase: Phase) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.generation == generation && lifecycle.phase.is_attempting() {
            lifecycle.phase = phase;
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.is_stopping() && self.inner.lifecycle.lock().generation == generation
    }
}

fn superseded() -> Error {
    Error::transport("connect", "attempt superseded")
}

async fn best_effort<F>(step: &'static str, fut: F)
where
    F: std::future::Future<Output = Result<()>>,
{
    if let Err(e) = fut.await {
        warn!(step, error = %e, "Teardown step failed");
    }
}

async fn teardown(link: Link) {
    if let Some(subscription) = link.subscription {
        best_effort("terminate subscription", subscription.terminate()).await;
    }
    if let Some(session) = link.session {
        best_effort("close session", session.close()).await;
    }
    if let Some(client) = link.client {
        best_effort("disconnect", client.disconnect()).await;
    }
}
