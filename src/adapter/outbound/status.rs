//! Status sink that writes status signals to the log.

use tracing::{error, info, warn};

use crate::domain::status::{Severity, Status};
use crate::port::StatusSink;

/// Logs each status at a level derived from its severity.
pub struct TracingStatusSink {
    source: &'static str,
}

impl TracingStatusSink {
    #[must_use]
    pub const fn new(source: &'static str) -> Self {
        Self { source }
    }
}

impl StatusSink for TracingStatusSink {
    fn emit(&self, status: Status) {
        let kind = format!("{:?}", status.kind);
        match status.severity {
            Severity::Error => error!(source = self.source, kind, text = %status.text, "Status"),
            Severity::Warning => warn!(source = self.source, kind, text = %status.text, "Status"),
            Severity::Ok | Severity::Pending | Severity::Idle => {
                info!(source = self.source, kind, text = %status.text, "Status");
            }
        }
    }
}
