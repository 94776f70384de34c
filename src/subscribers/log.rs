//! # LogWriter: event renderer over `tracing`
//!
//! A minimal subscriber that turns every [`Event`] into one `tracing` record
//! under the `ioapp::events` target.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO ioapp::events: runtime started workers=8
//! INFO ioapp::events: root submitted task="server"
//! INFO ioapp::events: shutdown requested signal=15 reason="SIGTERM"
//! INFO ioapp::events: cancel requested
//! INFO ioapp::events: cancel acknowledged
//! INFO ioapp::events: resources released
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::RuntimeStarted => {
                tracing::info!(target: "ioapp::events", workers = ?e.workers, "runtime started");
            }
            EventKind::MonitorInstalled => {
                tracing::info!(target: "ioapp::events", "unforked host detected; interrupt monitor installed");
            }
            EventKind::RootSubmitted => {
                tracing::info!(target: "ioapp::events", task, "root submitted");
            }
            EventKind::RootCompleted => {
                tracing::info!(target: "ioapp::events", task, exit_code = ?e.exit_code, "root completed");
            }
            EventKind::RootFailed => {
                tracing::error!(target: "ioapp::events", task, reason, "root failed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "ioapp::events", signal = ?e.signal, reason, "shutdown requested");
            }
            EventKind::CancelRequested => {
                tracing::info!(target: "ioapp::events", "cancel requested");
            }
            EventKind::CancelAcknowledged => {
                tracing::info!(target: "ioapp::events", "cancel acknowledged");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: "ioapp::events", grace_ms = ?e.grace_ms, "cancel grace exceeded");
            }
            EventKind::ResourcesReleased => {
                tracing::info!(target: "ioapp::events", "resources released");
            }
            EventKind::HookDeregistered => {
                tracing::debug!(target: "ioapp::events", "exit hook deregistered");
            }
            EventKind::HostRunEnded => {
                tracing::info!(target: "ioapp::events", "host ended the run");
            }
            EventKind::MainInterrupted => {
                tracing::info!(target: "ioapp::events", "main thread interrupted");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: "ioapp::events", subscriber = task, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
