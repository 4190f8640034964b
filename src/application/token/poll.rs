//! Background token poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::TokenCache;
use crate::domain::status::Status;

/// Handle to a running poll loop.
///
/// The loop calls [`TokenCache::ensure`] once immediately and then on every
/// interval tick. Failures are reported and the loop keeps going.
pub struct TokenPoller {
    stopping: Arc<AtomicBool>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl TokenPoller {
    /// Start polling; a zero interval disables the poll and returns `None`.
    pub fn spawn(cache: TokenCache, interval: Duration) -> Option<Self> {
        if interval.is_zero() {
            debug!("Token poll disabled");
            return None;
        }

        let stopping = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let flag = stopping.clone();

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "Token poll started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = timer.tick() => {
                        if flag.load(Ordering::SeqCst) {
                            break;
                        }
                        match cache.ensure(false).await {
                            Ok(grant) if grant.reused => cache.emit(Status::token_valid()),
                            Ok(_) => {}
                            Err(failure) => {
                                warn!(error = %failure, "Token poll failed, retrying next tick");
                            }
                        }
                    }
                }
            }
            debug!("Token poll stopped");
        });

        Some(Self {
            stopping,
            shutdown_tx,
            task,
        })
    }

    /// Stop the loop. The flag is set before anything else so a tick that
    /// is already due does not start another login.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.try_send(());
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                warn!(error = %e, "Token poll task failed");
            }
        }
    }
}

impl Drop for TokenPoller {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}
