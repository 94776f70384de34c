//! # Compute pool: the execution context of the root computation.
//!
//! [`ComputePool`] owns a multi-threaded tokio runtime sized to the hardware
//! parallelism. It runs the root computation and everything it spawns.
//!
//! ## Rules
//! - Workers are named `io-compute-0`, `io-compute-1`, ... in creation order.
//! - Workers never keep the process alive: process exit tears them down.
//! - [`ComputePool::shutdown`] runs **exactly once**; later calls are no-ops.
//! - Only the shutdown sequence calls `shutdown`, after cancellation resolved.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::config::{COMPUTE_THREAD_PREFIX, Config};
use crate::error::RuntimeError;

/// Fixed-size pool of background compute workers.
pub struct ComputePool {
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    workers: usize,
    teardown: Duration,
}

impl ComputePool {
    /// Builds the pool: `Config::compute_threads()` workers with deterministic names.
    pub fn provision(cfg: &Config) -> Result<Self, RuntimeError> {
        let workers = cfg.compute_threads();
        let next = Arc::new(AtomicUsize::new(0));

        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name_fn(move || {
                let n = next.fetch_add(1, Ordering::Relaxed);
                format!("{COMPUTE_THREAD_PREFIX}-{n}")
            })
            .enable_all()
            .build()
            .map_err(|e| RuntimeError::provision("compute pool", e))?;

        tracing::debug!(workers, "compute pool provisioned");
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            workers,
            teardown: cfg.teardown_timeout,
        })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runtime handle for engines that need to enter the pool.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns a future on the pool; `None` once the pool was shut down.
    pub fn spawn<F>(&self, fut: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.runtime.lock();
        guard.as_ref().map(|rt| rt.spawn(fut))
    }

    /// True once [`shutdown`](Self::shutdown) ran.
    pub fn is_shutdown(&self) -> bool {
        self.runtime.lock().is_none()
    }

    /// Stops the pool, waiting up to the configured teardown timeout for
    /// running tasks to yield. Returns `false` if it was already stopped.
    pub fn shutdown(&self) -> bool {
        let Some(runtime) = self.runtime.lock().take() else {
            return false;
        };
        // A runtime cannot block inside another runtime's context.
        if Handle::try_current().is_ok() {
            runtime.shutdown_background();
        } else {
            runtime.shutdown_timeout(self.teardown);
        }
        tracing::debug!("compute pool stopped");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(workers: usize) -> ComputePool {
        let cfg = Config {
            worker_threads: workers,
            teardown_timeout: Duration::from_millis(100),
            ..Config::default()
        };
        ComputePool::provision(&cfg).expect("pool")
    }

    #[test]
    fn workers_carry_compute_names() {
        let pool = pool(2);
        assert_eq!(pool.workers(), 2);

        let name = pool
            .handle()
            .block_on(pool.spawn(async { std::thread::current().name().map(str::to_owned) }).unwrap())
            .unwrap()
            .unwrap();
        assert!(name.starts_with("io-compute-"), "unexpected name {name}");
        pool.shutdown();
    }

    #[test]
    fn shutdown_happens_once() {
        let pool = pool(1);
        assert!(!pool.is_shutdown());
        assert!(pool.shutdown());
        assert!(!pool.shutdown());
        assert!(pool.is_shutdown());
        assert!(pool.spawn(async {}).is_none());
    }
}
