//! # One-shot, thread-safe completion primitive.
//!
//! [`OneShot`] holds at most one value. It is the single source of truth for
//! "has the root computation finished": the completion callback stores into it,
//! the main thread takes from it, and the exit hook only asks whether it is
//! still pending. All three go through the same lock, so a pending check can
//! never disagree with a store that already happened.
//!
//! ## States
//! ```text
//! Pending ──complete(v)──► Ready(v) ──take──► Taken
//!    │                         ▲
//!    │                         └── complete() again: rejected (returns false)
//!    └──seal()──► Sealed        (complete() rejected, waiters keep waiting)
//! ```
//!
//! `seal` is the exit hook's atomic "still running? then nobody may complete
//! any more" step: after it returns `true` the root outcome can no longer race
//! a cancellation.
//!
//! Waiting uses `park`/`unpark`, so a [`ThreadInterrupt`] raised on the waiting
//! thread wakes it as well.

use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::interrupt::ThreadInterrupt;

enum Slot<T> {
    Pending,
    Ready(T),
    Taken,
    Sealed,
}

/// Why a wait on a [`OneShot`] returned without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The waiting thread was interrupted.
    Interrupted,
    /// The timeout elapsed while still pending.
    TimedOut,
    /// The value was already taken by another consumer.
    Consumed,
}

/// Single-assignment cell with a blocking, interruptible wait.
pub struct OneShot<T> {
    slot: Mutex<Slot<T>>,
    waiter: Mutex<Option<Thread>>,
}

impl<T> OneShot<T> {
    /// Creates a pending cell.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            waiter: Mutex::new(None),
        }
    }

    /// Stores `value` if the cell is still pending and wakes the waiter.
    ///
    /// Returns `false` (dropping `value`) when a value was stored before.
    pub fn complete(&self, value: T) -> bool {
        self.complete_with(value, |_| {})
    }

    /// Like [`complete`](Self::complete), running `on_stored` with the stored
    /// value before any waiter can take it.
    ///
    /// `on_stored` runs under the cell's lock and must not touch the cell.
    pub fn complete_with(&self, value: T, on_stored: impl FnOnce(&T)) -> bool {
        {
            let mut slot = self.slot.lock();
            if !matches!(*slot, Slot::Pending) {
                return false;
            }
            on_stored(&value);
            *slot = Slot::Ready(value);
        }
        if let Some(waiter) = self.waiter.lock().as_ref() {
            waiter.unpark();
        }
        true
    }

    /// Non-blocking check: `true` until a value was stored or the cell was sealed.
    pub fn is_pending(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Pending)
    }

    /// Atomically moves a pending cell to `Sealed`, rejecting later completions.
    ///
    /// Returns `false` if a value was already stored (or the cell was sealed before).
    pub fn seal(&self) -> bool {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Sealed;
            true
        } else {
            false
        }
    }

    /// Takes the value if it is ready.
    pub fn try_take(&self) -> Result<Option<T>, WaitError> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(v) => Ok(Some(v)),
            Slot::Pending => {
                *slot = Slot::Pending;
                Ok(None)
            }
            Slot::Sealed => {
                *slot = Slot::Sealed;
                Ok(None)
            }
            Slot::Taken => Err(WaitError::Consumed),
        }
    }

    /// Blocks until the value is stored or `interrupt` (the calling thread's
    /// handle) is raised. A raised flag is cleared when reported.
    pub fn wait(&self, interrupt: &ThreadInterrupt) -> Result<T, WaitError> {
        self.wait_inner(None, Some(interrupt))
    }

    /// Blocks until the value is stored or `timeout` elapses (`None` = forever).
    pub fn wait_timeout(&self, timeout: Option<Duration>) -> Result<T, WaitError> {
        self.wait_inner(timeout, None)
    }

    fn wait_inner(
        &self,
        timeout: Option<Duration>,
        interrupt: Option<&ThreadInterrupt>,
    ) -> Result<T, WaitError> {
        *self.waiter.lock() = Some(thread::current());
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(v) = self.try_take()? {
                return Ok(v);
            }
            if interrupt.is_some_and(ThreadInterrupt::clear) {
                return Err(WaitError::Interrupted);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(WaitError::TimedOut);
                    }
                    thread::park_timeout(deadline - now);
                }
                None => thread::park(),
            }
        }
    }
}

impl<T> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}
