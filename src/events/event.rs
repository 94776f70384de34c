//! # Runtime events emitted while driving the root computation.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Startup events**: provisioning, monitor installation, submission
//! - **Outcome events**: the root computation completed or failed
//! - **Shutdown events**: exit hook, cancellation, teardown
//!
//! The [`Event`] struct carries additional metadata such as timestamps, exit
//! codes, signals and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are observed from several threads.
//!
//! ## Example
//! ```rust
//! use ioapp::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ShutdownRequested)
//!     .with_signal(15)
//!     .with_reason("SIGTERM");
//!
//! assert_eq!(ev.kind, EventKind::ShutdownRequested);
//! assert_eq!(ev.signal, Some(15));
//! assert_eq!(ev.reason.as_deref(), Some("SIGTERM"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Startup ===
    /// Compute pool and timer scheduler are provisioned.
    ///
    /// Sets:
    /// - `workers`: compute pool size
    RuntimeStarted,

    /// Unforked host detected; watcher thread spawned.
    MonitorInstalled,

    /// Root computation submitted to the engine.
    ///
    /// Sets:
    /// - `task`: app name
    RootSubmitted,

    // === Outcome ===
    /// Root computation finished with an exit code.
    ///
    /// Sets:
    /// - `task`: app name
    /// - `exit_code`: the produced code
    RootCompleted,

    /// Root computation failed.
    ///
    /// Sets:
    /// - `task`: app name
    /// - `reason`: failure message
    RootFailed,

    // === Shutdown ===
    /// Exit hook fired (OS signal or embedder token) or ran inline.
    ///
    /// Sets:
    /// - `signal`: signal number, when a signal caused it
    /// - `reason`: trigger description
    ShutdownRequested,

    /// Cancellation requested on the in-flight root computation.
    CancelRequested,

    /// Root computation acknowledged cancellation.
    CancelAcknowledged,

    /// Cancellation was not acknowledged within the configured grace.
    ///
    /// Sets:
    /// - `grace_ms`: the grace that elapsed
    GraceExceeded,

    /// Timer scheduler and compute pool are stopped.
    ResourcesReleased,

    /// Exit hook deregistered on a normal termination path.
    HookDeregistered,

    /// The unforked host reported that the run is no longer active.
    HostRunEnded,

    /// The main thread was interrupted while waiting for the outcome.
    MainInterrupted,

    // === Subscribers ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// App or subscriber name, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, triggers, etc.).
    pub reason: Option<Arc<str>>,
    /// Exit code produced by the root computation.
    pub exit_code: Option<i32>,
    /// Signal number that triggered shutdown.
    pub signal: Option<i32>,
    /// Compute pool size.
    pub workers: Option<u32>,
    /// Cancellation grace in milliseconds (compact).
    pub grace_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            exit_code: None,
            signal: None,
            workers: None,
            grace_ms: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an app or subscriber name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attaches a signal number.
    #[inline]
    pub fn with_signal(mut self, signal: i32) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches the compute pool size.
    #[inline]
    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a grace duration (stored as milliseconds).
    #[inline]
    pub fn with_grace(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.grace_ms = Some(ms);
        self
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events emitted when a subscriber panicked.
    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
