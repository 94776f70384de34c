//! # Shutdown sequence: cancel, await acknowledgment, release resources.
//!
//! [`ShutdownSequence`] is the body of the process-exit hook. It can be invoked
//! by the hook thread or inline by the main thread; whoever comes first runs it,
//! everyone else blocks until that run finished and observes the same
//! [`ShutdownReport`].
//!
//! ## State machine
//! ```text
//!            signal pending?
//!   Idle ─────── yes ───► CancelRequested ── ack (or grace exceeded) ──► CancelAcknowledged
//!     │                                                                        │
//!     └──── no (outcome already stored) ───────────────────────────────────────┤
//!                                                                              ▼
//!                                              scheduler.shutdown(); compute.shutdown()
//!                                                                              │
//!                                                                              ▼
//!                                                                     ResourcesReleased
//! ```
//!
//! ## Rules
//! - The pending check is [`OneShot::seal`]: it atomically decides between
//!   "cancel" and "already finished", so a completion that races the hook can
//!   never be overwritten or observed twice.
//! - Teardown starts only after the acknowledgment (or after the grace period
//!   elapsed, which is reported as `GraceExceeded`).
//! - The pool and the timer are shut down here and nowhere else.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;

use super::compute::ComputePool;
use super::engine::{CancelRef, Outcome};
use super::oneshot::OneShot;
use super::scheduler::Scheduler;
use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

/// Progress of the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownState {
    /// Not started.
    Idle,
    /// Cancellation requested, waiting for the acknowledgment.
    CancelRequested,
    /// Cancellation acknowledged (or given up on after the grace period).
    CancelAcknowledged,
    /// Timer thread and compute pool are stopped.
    ResourcesReleased,
}

/// What the (single) run of the sequence did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The root computation was still running and got cancelled.
    pub cancel_requested: bool,
    /// The acknowledgment did not arrive within `Config::cancel_grace`.
    pub grace_exceeded: bool,
}

/// Idempotent, at-most-once shutdown procedure.
pub struct ShutdownSequence {
    handle: CancelRef,
    signal: Arc<OneShot<Outcome>>,
    compute: Arc<ComputePool>,
    scheduler: Scheduler,
    grace: Option<Duration>,
    bus: Bus,
    state: Mutex<ShutdownState>,
    report: OnceLock<ShutdownReport>,
}

impl ShutdownSequence {
    /// Binds the sequence to the running computation and its resources.
    pub fn new(
        handle: CancelRef,
        signal: Arc<OneShot<Outcome>>,
        compute: Arc<ComputePool>,
        scheduler: Scheduler,
        cfg: &Config,
        bus: Bus,
    ) -> Self {
        Self {
            handle,
            signal,
            compute,
            scheduler,
            grace: cfg.cancel_grace(),
            bus,
            state: Mutex::new(ShutdownState::Idle),
            report: OnceLock::new(),
        }
    }

    /// Runs the sequence, or waits for the run already in progress.
    pub fn run(&self) -> ShutdownReport {
        *self.report.get_or_init(|| self.execute())
    }

    #[cfg(test)]
    fn state(&self) -> ShutdownState {
        *self.state.lock()
    }

    /// True once a run completed.
    pub fn has_run(&self) -> bool {
        self.report.get().is_some()
    }

    fn execute(&self) -> ShutdownReport {
        let mut report = ShutdownReport {
            cancel_requested: false,
            grace_exceeded: false,
        };

        if self.signal.seal() {
            report.cancel_requested = true;
            self.set(ShutdownState::CancelRequested);
            self.bus.publish(Event::new(EventKind::CancelRequested));

            let ack = Arc::new(OneShot::new());
            let acked = Arc::clone(&ack);
            self.handle.cancel(Box::new(move || {
                acked.complete(());
            }));

            match ack.wait_timeout(self.grace) {
                Ok(()) => self.bus.publish(Event::new(EventKind::CancelAcknowledged)),
                Err(_) => {
                    report.grace_exceeded = true;
                    let grace = self.grace.unwrap_or_default();
                    let err = RuntimeError::GraceExceeded { grace };
                    tracing::warn!(error = %err, label = err.as_label(), "tearing down without acknowledgment");
                    self.bus
                        .publish(Event::new(EventKind::GraceExceeded).with_grace(grace));
                }
            }
            self.set(ShutdownState::CancelAcknowledged);
        } else {
            tracing::debug!("root computation already finished; skipping cancellation");
        }

        self.scheduler.shutdown();
        self.compute.shutdown();
        self.set(ShutdownState::ResourcesReleased);
        self.bus.publish(Event::new(EventKind::ResourcesReleased));
        report
    }

    fn set(&self, next: ShutdownState) {
        let prev = std::mem::replace(&mut *self.state.lock(), next);
        tracing::debug!(from = ?prev, to = ?next, "shutdown state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{AckCallback, Cancel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Acknowledges after `delay` on a separate thread; `None` never acknowledges.
    struct FakeFiber {
        delay: Option<Duration>,
        cancels: AtomicUsize,
    }

    impl Cancel for FakeFiber {
        fn cancel(&self, on_ack: AckCallback) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                thread::spawn(move || {
                    thread::sleep(delay);
                    on_ack();
                });
            }
        }
    }

    fn sequence(delay: Option<Duration>, grace: Duration) -> (Arc<ShutdownSequence>, Arc<FakeFiber>, Bus) {
        let cfg = Config {
            worker_threads: 1,
            cancel_grace: grace,
            ..Config::default()
        };
        let fiber = Arc::new(FakeFiber {
            delay,
            cancels: AtomicUsize::new(0),
        });
        let bus = Bus::detached(64);
        let seq = ShutdownSequence::new(
            fiber.clone(),
            Arc::new(OneShot::new()),
            Arc::new(ComputePool::provision(&cfg).unwrap()),
            Scheduler::provision(&cfg).unwrap(),
            &cfg,
            bus.clone(),
        );
        (Arc::new(seq), fiber, bus)
    }

    fn kinds(bus_rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = bus_rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    #[test]
    fn pending_root_is_cancelled_before_teardown() {
        let (seq, fiber, bus) = sequence(Some(Duration::from_millis(30)), Duration::from_secs(5));
        let mut rx = bus.subscribe();

        let report = seq.run();
        assert!(report.cancel_requested);
        assert!(!report.grace_exceeded);
        assert_eq!(fiber.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(seq.state(), ShutdownState::ResourcesReleased);
        assert!(seq.compute.is_shutdown());
        assert!(seq.scheduler.is_shutdown());
        assert_eq!(
            kinds(&mut rx),
            vec![
                EventKind::CancelRequested,
                EventKind::CancelAcknowledged,
                EventKind::ResourcesReleased
            ]
        );
    }

    #[test]
    fn finished_root_skips_cancellation() {
        let (seq, fiber, bus) = sequence(Some(Duration::ZERO), Duration::from_secs(5));
        let mut rx = bus.subscribe();
        assert!(seq.signal.complete(Ok(0)));

        let report = seq.run();
        assert!(!report.cancel_requested);
        assert_eq!(fiber.cancels.load(Ordering::SeqCst), 0);
        assert_eq!(kinds(&mut rx), vec![EventKind::ResourcesReleased]);
        // The stored outcome is untouched.
        assert_eq!(seq.signal.try_take().unwrap().unwrap().unwrap(), 0);
    }

    #[test]
    fn concurrent_callers_share_one_run() {
        let (seq, fiber, bus) = sequence(Some(Duration::from_millis(20)), Duration::from_secs(5));
        let mut rx = bus.subscribe();

        let callers: Vec<_> = (0..4)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || seq.run())
            })
            .collect();
        let reports: Vec<_> = callers.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(reports.windows(2).all(|w| w[0] == w[1]));
        assert!(seq.has_run());
        assert_eq!(fiber.cancels.load(Ordering::SeqCst), 1);
        let released = kinds(&mut rx)
            .into_iter()
            .filter(|k| *k == EventKind::ResourcesReleased)
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn grace_exceeded_still_releases_resources() {
        let (seq, _fiber, bus) = sequence(None, Duration::from_millis(40));
        let mut rx = bus.subscribe();

        let report = seq.run();
        assert!(report.cancel_requested);
        assert!(report.grace_exceeded);
        assert_eq!(seq.state(), ShutdownState::ResourcesReleased);
        assert!(seq.compute.is_shutdown());

        let kinds = kinds(&mut rx);
        assert_eq!(
            kinds,
            vec![
                EventKind::CancelRequested,
                EventKind::GraceExceeded,
                EventKind::ResourcesReleased
            ]
        );
    }
}
