//! # Task engine seam: submit the root computation, cancel it, observe the outcome.
//!
//! The runtime never polls the root future itself. It hands it to an
//! [`Engine`], which runs it on the compute pool and reports back through two
//! callbacks:
//!
//! - `on_complete(outcome)`: invoked **at most once**, when the computation
//!   finished on its own (exit code, error or panic);
//! - `on_ack()`: passed to [`Cancel::cancel`], invoked once the computation
//!   has fully observed cancellation.
//!
//! ## Event flow ([`TokioEngine`])
//!
//! ```text
//! Completion:
//!   app.run(args) → Ok(code) / Err(e) / panic → on_complete(outcome) → finish() → acks
//!
//! Cancellation:
//!   cancel(on_ack) → token.cancel() → select! drops app future (destructors run)
//!                                    → on_complete NOT called → finish() → on_ack()
//! ```
//!
//! `finish()` runs from a drop guard, so a destructor that panics while the
//! cancelled future is dropped still delivers the acknowledgment.
//!
//! ## Rules
//! - A cancelled computation never reports an outcome; the exit hook sealed the
//!   completion signal before cancelling anyway.
//! - Acknowledgment is delivered on the compute pool, **before** the pool can be
//!   shut down (the sequence waits for it).
//! - Cancelling a finished computation acknowledges immediately.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::compute::ComputePool;
use super::scheduler::Scheduler;
use crate::app::AppRef;
use crate::error::AppError;

/// Terminal outcome of the root computation.
pub type Outcome = Result<i32, AppError>;
/// Receives the root outcome.
pub type CompletionCallback = Box<dyn FnOnce(Outcome) + Send + 'static>;
/// Receives the cancellation acknowledgment.
pub type AckCallback = Box<dyn FnOnce() + Send + 'static>;
/// Shared cancellation handle of a submitted computation.
pub type CancelRef = Arc<dyn Cancel>;

/// In-flight computation that can be asked to stop.
pub trait Cancel: Send + Sync + 'static {
    /// Requests cancellation; `on_ack` runs once cancellation has been fully observed.
    fn cancel(&self, on_ack: AckCallback);
}

/// Runs root computations on the runtime's compute pool and timer.
pub trait Engine: Send + Sync + 'static {
    /// Starts `app.run(args)` without blocking and returns its cancellation handle.
    fn submit(
        &self,
        app: AppRef,
        args: Vec<String>,
        compute: &ComputePool,
        scheduler: &Scheduler,
        on_complete: CompletionCallback,
    ) -> CancelRef;
}

/// Default engine: one tokio task on the compute pool per root computation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioEngine;

impl Engine for TokioEngine {
    fn submit(
        &self,
        app: AppRef,
        args: Vec<String>,
        compute: &ComputePool,
        scheduler: &Scheduler,
        on_complete: CompletionCallback,
    ) -> CancelRef {
        let fiber = Arc::new(FiberHandle::new());
        let token = fiber.token.clone();
        let finished = Arc::clone(&fiber);
        let root = scheduler.scope(async move { app.run(args).await });

        // `on_complete` moves into the task; keep a way to report a refused spawn.
        let on_complete = Arc::new(Mutex::new(Some(on_complete)));
        let report = Arc::clone(&on_complete);

        let spawned = compute.spawn(async move {
            // Acks even if dropping the cancelled root unwinds.
            let _finish = Finish(finished);
            let res = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                r = AssertUnwindSafe(root).catch_unwind() => Some(r),
            };
            if let Some(r) = res {
                let outcome = r.unwrap_or_else(|payload| Err(AppError::from_panic(payload)));
                if let Some(cb) = report.lock().take() {
                    cb(outcome);
                }
            }
        });

        if spawned.is_none() {
            if let Some(cb) = on_complete.lock().take() {
                cb(Err(AppError::fail("compute pool is shut down")));
            }
            fiber.finish();
        }
        fiber
    }
}

struct Finish(Arc<FiberHandle>);

impl Drop for Finish {
    fn drop(&mut self) {
        self.0.finish();
    }
}

struct AckState {
    finished: bool,
    waiters: Vec<AckCallback>,
}

/// Cancellation handle of a [`TokioEngine`] computation.
pub struct FiberHandle {
    token: CancellationToken,
    state: Mutex<AckState>,
}

impl FiberHandle {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            state: Mutex::new(AckState {
                finished: false,
                waiters: Vec::new(),
            }),
        }
    }

    /// True once the computation stopped (completed or cancelled).
    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    /// True once cancellation was requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    fn finish(&self) {
        let waiters = {
            let mut st = self.state.lock();
            st.finished = true;
            std::mem::take(&mut st.waiters)
        };
        for ack in waiters {
            ack();
        }
    }
}

impl Cancel for FiberHandle {
    fn cancel(&self, on_ack: AckCallback) {
        self.token.cancel();
        let mut st = self.state.lock();
        if st.finished {
            drop(st);
            on_ack();
        } else {
            st.waiters.push(on_ack);
        }
    }
}
