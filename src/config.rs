//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for [`AppRuntime`](crate::AppRuntime).
//!
//! ## Sentinel values
//! - `worker_threads = 0` → one worker per available hardware execution unit
//! - `cancel_grace = 0s` → wait for cancellation acknowledgment indefinitely
//! - `teardown_timeout = 0s` → do not wait for in-flight compute tasks on teardown
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use ioapp::Config;
//!
//! let mut cfg = Config::default();
//! cfg.worker_threads = 2;
//! cfg.cancel_grace = Duration::from_secs(5);
//!
//! assert_eq!(cfg.compute_threads(), 2);
//! assert_eq!(cfg.cancel_grace(), Some(Duration::from_secs(5)));
//! ```

use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Name prefix of compute worker threads (`io-compute-0`, `io-compute-1`, ...).
pub const COMPUTE_THREAD_PREFIX: &str = "io-compute";
/// Name of the dedicated timer thread.
pub const SCHEDULER_THREAD_NAME: &str = "io-scheduler";
/// Name of the unforked-host watcher thread.
pub const MONITOR_THREAD_NAME: &str = "ioapp-sbt-unforked-interrupt-monitor";
/// Name of the thread that runs the process-exit hook.
pub const HOOK_THREAD_NAME: &str = "io-cancel-hook";

/// Global configuration for the entry-point runtime.
///
/// Defines:
/// - **Provisioning**: compute pool size
/// - **Shutdown behavior**: cancellation grace and teardown bound
/// - **Host compatibility**: unforked-host detection and poll interval
/// - **Event system**: bus capacity for event delivery
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of compute worker threads.
    ///
    /// - `0` = number of available hardware execution units (minimum 1)
    /// - `n > 0` = exactly `n` workers
    pub worker_threads: usize,

    /// Maximum time the shutdown hook waits for the root computation to
    /// acknowledge cancellation before tearing resources down anyway.
    ///
    /// - `Duration::ZERO` = wait indefinitely
    /// - `> 0` = bounded wait; exceeding it publishes `GraceExceeded`
    pub cancel_grace: Duration,

    /// Upper bound for draining the compute pool once cancellation resolved.
    pub teardown_timeout: Duration,

    /// Poll interval of the unforked-host watcher thread.
    pub monitor_interval: Duration,

    /// Whether to probe for an unforked host harness at startup.
    pub detect_unforked_host: bool,

    /// Thread-name prefix the unforked host gives to the threads it runs user code on.
    pub host_marker: Cow<'static, str>,

    /// Whether the exit hook listens for OS termination signals.
    ///
    /// Embedders that drive shutdown through their own token usually turn this off.
    pub handle_signals: bool,

    /// Capacity of the event bus broadcast channel ring buffer (min 1).
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the effective number of compute workers (never zero).
    #[inline]
    pub fn compute_threads(&self) -> usize {
        match self.worker_threads {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            n => n,
        }
    }

    /// Returns the cancellation grace as an `Option`.
    ///
    /// - `None` → wait for acknowledgment indefinitely
    /// - `Some(d)` → give up waiting after `d`
    #[inline]
    pub fn cancel_grace(&self) -> Option<Duration> {
        if self.cancel_grace == Duration::ZERO {
            None
        } else {
            Some(self.cancel_grace)
        }
    }

    /// Returns a monitor poll interval clamped to at least one millisecond.
    #[inline]
    pub fn monitor_interval_clamped(&self) -> Duration {
        self.monitor_interval.max(Duration::from_millis(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `worker_threads = 0` (hardware parallelism)
    /// - `cancel_grace = 60s`
    /// - `teardown_timeout = 5s`
    /// - `monitor_interval = 100ms`
    /// - `detect_unforked_host = true`, `host_marker = "run-main"`
    /// - `handle_signals = true`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            worker_threads: 0,
            cancel_grace: Duration::from_secs(60),
            teardown_timeout: Duration::from_secs(5),
            monitor_interval: Duration::from_millis(100),
            detect_unforked_host: true,
            host_marker: Cow::Borrowed("run-main"),
            handle_signals: true,
            bus_capacity: 1024,
        }
    }
}
