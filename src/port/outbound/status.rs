//! Status port for the external observability surface.

use std::sync::Arc;

use crate::domain::status::Status;

/// Receives a status tuple after every state change.
pub trait StatusSink: Send + Sync {
    fn emit(&self, status: Status);
}

/// Discards every status.
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn emit(&self, _status: Status) {}
}

/// Fans a status out to several sinks.
#[derive(Default)]
pub struct StatusFanout {
    sinks: Vec<Arc<dyn StatusSink>>,
}

impl StatusFanout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Arc<dyn StatusSink>) {
        self.sinks.push(sink);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl StatusSink for StatusFanout {
    fn emit(&self, status: Status) {
        for sink in &self.sinks {
            sink.emit(status.clone());
        }
    }
}
