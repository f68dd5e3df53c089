//! Progress and warning reporting

use tracing::{info, warn};

/// Receives human-readable progress and warning messages from the planner
///
/// Both methods default to doing nothing.
pub trait QueryObserver: Send + Sync {
    /// Dataset identity, row/page counts and per-page progress
    fn on_progress(&self, _message: &str) {}

    /// Row count clamping (empty dataset, offset past the end, limit too large)
    fn on_warning(&self, _message: &str) {}
}

/// Observer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QueryObserver for NoopObserver {}

/// Observer that forwards messages to `tracing`
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    progress: bool,
}

impl TracingObserver {
    /// Log progress at INFO and warnings at WARN
    pub fn new() -> Self {
        Self { progress: true }
    }

    /// Log warnings only
    pub fn warnings_only() -> Self {
        Self { progress: false }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryObserver for TracingObserver {
    fn on_progress(&self, message: &str) {
        if self.progress {
            info!("{message}");
        }
    }

    fn on_warning(&self, message: &str) {
        warn!("{message}");
    }
}
