//! Recording status sink.

use parking_lot::Mutex;

use crate::domain::status::{Status, StatusKind};
use crate::port::StatusSink;

/// Keeps every emitted status for later assertions.
#[derive(Default)]
pub struct RecordingStatusSink {
    statuses: Mutex<Vec<Status>>,
}

impl RecordingStatusSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().clone()
    }

    /// Kinds in emission order.
    #[must_use]
    pub fn kinds(&self) -> Vec<StatusKind> {
        self.statuses.lock().iter().map(|s| s.kind).collect()
    }

    #[must_use]
    pub fn count(&self, kind: StatusKind) -> usize {
        self.statuses.lock().iter().filter(|s| s.kind == kind).count()
    }

    #[must_use]
    pub fn last(&self) -> Option<Status> {
        self.statuses.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.statuses.lock().clear();
    }
}

impl StatusSink for RecordingStatusSink {
    fn emit(&self, status: Status) {
        self.statuses.lock().push(status);
    }
}
