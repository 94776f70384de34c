//! # Per-thread interruption status.
//!
//! [`ThreadInterrupt`] gives every OS thread a sticky "interrupted" flag that
//! another thread can raise. Raising it also unparks the target thread, so a
//! thread blocked in [`OneShot::wait`](super::oneshot::OneShot::wait) wakes up
//! and observes the interruption.
//!
//! ```text
//! io-cancel-hook / monitor            main thread
//!        │                                 │ OneShot::wait()
//!        │ interrupt() ──► flag=true       │   park()
//!        │              └► unpark() ──────►│   clear() == true → Err(Interrupted)
//!        ▼                                 ▼ restore()  (flag visible to the caller again)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

struct Inner {
    thread: Thread,
    flag: AtomicBool,
}

thread_local! {
    static CURRENT: ThreadInterrupt = ThreadInterrupt {
        inner: Arc::new(Inner {
            thread: thread::current(),
            flag: AtomicBool::new(false),
        }),
    };
}

/// Cloneable handle to one thread's interruption status.
#[derive(Clone)]
pub struct ThreadInterrupt {
    inner: Arc<Inner>,
}

impl ThreadInterrupt {
    /// Returns the handle of the calling thread.
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// Raises the flag and wakes the thread if it is parked.
    pub fn interrupt(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.thread.unpark();
    }

    /// Returns whether the flag is raised, without clearing it.
    pub fn is_interrupted(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Clears the flag, returning whether it was raised.
    pub fn clear(&self) -> bool {
        self.inner.flag.swap(false, Ordering::SeqCst)
    }

    /// Raises the flag again without waking the thread.
    ///
    /// Used when an interruption was consumed by a wait but must stay visible
    /// to whoever called into the runtime.
    pub fn restore(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
    }

    /// Name of the owning thread, if any.
    pub fn thread_name(&self) -> Option<&str> {
        self.inner.thread.name()
    }
}

impl std::fmt::Debug for ThreadInterrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadInterrupt")
            .field("thread", &self.inner.thread.id())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}
