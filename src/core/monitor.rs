//! # Unforked-host interrupt monitor.
//!
//! Some build tools run `main` inside their own long-lived process instead of
//! forking a new one. Abandoning such a run never delivers a termination signal,
//! so the exit hook never fires. The monitor compensates: when a [`HostProbe`]
//! recognizes the host and hands out its "run is active" cell, a low-priority
//! watcher thread polls that cell and interrupts the main thread once the host
//! reports the run as over.
//!
//! ```text
//! try_install(probe) ── detect() ──► Ok(None) ───────────► no monitor
//!                          │   ├──► Err(e) ──(debug log)──► no monitor
//!                          │   └──► panic ──(caught)──────► no monitor
//!                          ▼
//!                     Ok(Some(cell)) ──► spawn watcher (lowest priority)
//!                                      loop every monitor_interval:
//!                                        cell.is_active()?  yes → keep polling
//!                                                           no  → HostRunEnded, main.interrupt(), exit
//! ```
//!
//! Installation is strictly best-effort: every failure is discarded here and
//! never affects a normal run. Probes report failures as `Err`, which stays
//! silent. A panicking probe is caught too, but the process panic hook has
//! already printed its message by then.

use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use super::interrupt::ThreadInterrupt;
use super::priority;
use crate::config::{Config, MONITOR_THREAD_NAME};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

/// The host's view of whether the current logical run is still going.
pub trait ActiveRun: Send + Sync + 'static {
    /// `false` once the host abandoned or finished the run.
    fn is_active(&self) -> bool;
}

impl ActiveRun for AtomicBool {
    fn is_active(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// Recognizes a specific host environment.
pub trait HostProbe: Send + Sync + 'static {
    /// Returns the host's active-run cell, or `None` when not running under it.
    ///
    /// Return `Err` when the host cannot be inspected; do not panic, since
    /// the panic hook would still print the failure.
    fn detect(&self) -> Result<Option<Arc<dyn ActiveRun>>, RuntimeError>;
}

static HOST_RUN: Mutex<Option<Arc<dyn ActiveRun>>> = parking_lot::const_mutex(None);

/// Publishes the active-run cell of the current host run.
///
/// Called by host harnesses before invoking `main` in-process.
pub fn publish_active_run(cell: Arc<dyn ActiveRun>) {
    *HOST_RUN.lock() = Some(cell);
}

/// Removes the published active-run cell.
pub fn clear_active_run() {
    HOST_RUN.lock().take();
}

/// Probe for in-process build tool runners.
///
/// Matches when the calling thread's name contains the configured marker and a
/// harness published its cell through [`publish_active_run`].
#[derive(Debug, Clone)]
pub struct UnforkedHostProbe {
    marker: Cow<'static, str>,
}

impl UnforkedHostProbe {
    /// Creates a probe looking for `marker` in the thread name.
    pub fn new(marker: impl Into<Cow<'static, str>>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Creates a probe using `Config::host_marker`.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.host_marker.clone())
    }
}

impl HostProbe for UnforkedHostProbe {
    fn detect(&self) -> Result<Option<Arc<dyn ActiveRun>>, RuntimeError> {
        let current = thread::current();
        if !current.name().is_some_and(|n| n.contains(self.marker.as_ref())) {
            return Ok(None);
        }
        Ok(HOST_RUN.lock().clone())
    }
}

/// Running watcher thread.
pub struct InterruptMonitor {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl InterruptMonitor {
    /// Installs the watcher if `probe` recognizes the host. Never fails.
    pub fn try_install(
        probe: &dyn HostProbe,
        main: ThreadInterrupt,
        cfg: &Config,
        bus: &Bus,
    ) -> Option<Self> {
        let attempt = catch_unwind(AssertUnwindSafe(|| Self::install(probe, main, cfg, bus)));
        match attempt {
            Ok(monitor) => monitor,
            Err(_) => {
                tracing::debug!("host probe panicked; interrupt monitor skipped");
                None
            }
        }
    }

    fn install(
        probe: &dyn HostProbe,
        main: ThreadInterrupt,
        cfg: &Config,
        bus: &Bus,
    ) -> Option<Self> {
        let run = match probe.detect() {
            Ok(run) => run?,
            Err(e) => {
                tracing::debug!(label = e.as_label(), error = %e, "interrupt monitor skipped");
                return None;
            }
        };
        let interval = cfg.monitor_interval_clamped();
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let stop = Arc::clone(&stop);
            let bus = bus.clone();
            thread::Builder::new()
                .name(MONITOR_THREAD_NAME.to_string())
                .spawn(move || {
                    priority::lower_current();
                    while !stop.load(Ordering::SeqCst) {
                        if !run.is_active() {
                            bus.publish(Event::new(EventKind::HostRunEnded));
                            main.interrupt();
                            return;
                        }
                        thread::park_timeout(interval);
                    }
                })
        };
        let thread = match thread {
            Ok(thread) => thread,
            Err(err) => {
                tracing::debug!(%err, "interrupt monitor thread not started");
                return None;
            }
        };

        bus.publish(Event::new(EventKind::MonitorInstalled));
        Some(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// True once the watcher thread exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the watcher and waits for it.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}
