//! # Timer scheduler: one dedicated thread for delayed callbacks.
//!
//! [`Scheduler`] owns the `io-scheduler` thread, which drives a single-threaded
//! tokio runtime with only the time driver enabled. Delays and timeouts of the
//! root computation are served here so compute-bound work on the pool cannot
//! starve them.
//!
//! ## Architecture
//! ```text
//! any thread ── schedule(delay, cb) ──► Handle::spawn ──► io-scheduler thread
//!                                                          block_on(stop signal)
//!                                                            ├─ sleep(delay).await
//!                                                            └─ cb()
//! ```
//!
//! ## Rules
//! - Callbacks run on the scheduler thread and must return quickly.
//! - The thread requests the highest OS priority it can get (best effort).
//! - [`Scheduler::shutdown`] runs **exactly once**; pending callbacks are dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tokio::task::futures::TaskLocalFuture;

use super::priority;
use crate::config::{Config, SCHEDULER_THREAD_NAME};
use crate::error::RuntimeError;

tokio::task_local! {
    static CURRENT: Scheduler;
}

/// Handle to the dedicated timer thread. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: std::sync::Arc<Inner>,
}

struct Inner {
    handle: Handle,
    closed: AtomicBool,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Spawns the `io-scheduler` thread.
    pub fn provision(_cfg: &Config) -> Result<Self, RuntimeError> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| RuntimeError::provision("timer scheduler", e))?;
        let handle = runtime.handle().clone();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(SCHEDULER_THREAD_NAME.to_string())
            .spawn(move || {
                priority::raise_current();
                runtime.block_on(async {
                    let _ = stop_rx.await;
                });
                runtime.shutdown_background();
            })
            .map_err(|e| RuntimeError::provision("timer scheduler thread", e))?;

        tracing::debug!("timer scheduler provisioned");
        Ok(Self {
            inner: std::sync::Arc::new(Inner {
                handle,
                closed: AtomicBool::new(false),
                stop: Mutex::new(Some(stop_tx)),
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Runs `callback` on the scheduler thread after `delay`.
    ///
    /// Returns `None` if the scheduler was already shut down.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> Option<TimerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shutdown() {
            return None;
        }
        let join = self.inner.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Some(TimerHandle { join })
    }

    /// Future that resolves after `delay`, timed by the scheduler thread.
    ///
    /// Never resolves once the scheduler is shut down: a stopped timer does
    /// not report time as elapsed.
    pub fn sleep(&self, delay: Duration) -> Sleep {
        let (tx, rx) = oneshot::channel();
        let timer = self.schedule(delay, move || {
            let _ = tx.send(());
        });
        Sleep {
            rx,
            timer,
            stalled: false,
        }
    }

    /// True once [`shutdown`](Self::shutdown) ran.
    pub fn is_shutdown(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stops the scheduler thread and joins it (unless called from that thread).
    ///
    /// Returns `false` if it was already stopped.
    pub fn shutdown(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(stop) = self.inner.stop.lock().take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.inner.thread.lock().take() {
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
        tracing::debug!("timer scheduler stopped");
        true
    }

    /// Runs `fut` with this scheduler installed as the ambient timer for [`sleep`].
    pub(crate) fn scope<F: Future>(&self, fut: F) -> TaskLocalFuture<Scheduler, F> {
        CURRENT.scope(self.clone(), fut)
    }

    /// The ambient scheduler of the running root computation, if any.
    pub fn current() -> Option<Scheduler> {
        CURRENT.try_with(Clone::clone).ok()
    }
}

/// Cancels a scheduled callback.
pub struct TimerHandle {
    join: tokio::task::JoinHandle<()>,
}

impl TimerHandle {
    /// Prevents the callback from running if it has not fired yet.
    pub fn cancel(&self) {
        self.join.abort();
    }

    /// True once the callback ran or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Future returned by [`Scheduler::sleep`]; dropping it cancels the timer.
pub struct Sleep {
    rx: oneshot::Receiver<()>,
    timer: Option<TimerHandle>,
    // Timer dropped without firing; the receiver must not be polled again.
    stalled: bool,
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.stalled {
            return Poll::Pending;
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(()),
            Poll::Ready(Err(_)) => {
                self.stalled = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(timer) = &self.timer {
            timer.cancel();
        }
    }
}

/// Sleeps for `delay` on the root computation's dedicated timer thread.
///
/// Outside a computation driven by [`AppRuntime`](crate::AppRuntime) (for
/// example in tasks spawned with a bare `tokio::spawn`) this falls back to
/// [`tokio::time::sleep`].
pub async fn sleep(delay: Duration) {
    match Scheduler::current() {
        Some(scheduler) => scheduler.sleep(delay).await,
        None => tokio::time::sleep(delay).await,
    }
}
