//! # Root fiber driver.
//!
//! [`RootDriver::submit`] starts the root computation through the configured
//! [`Engine`] and wires its completion into a [`OneShot`] completion signal.
//! The main thread then blocks in [`RootDriver::wait`] until the outcome is
//! available or the thread is interrupted.
//!
//! ```text
//! main ── submit ──► Engine ──► compute pool
//!   │                               │ on_complete(outcome)
//!   │                               ▼
//!   └── wait ◄──────────── OneShot::complete_with ──► RootCompleted / RootFailed
//! ```
//!
//! The completion event is published while the signal is locked, so it always
//! precedes whatever the main thread or the exit hook do after observing it.

use std::sync::Arc;

use super::compute::ComputePool;
use super::engine::{CancelRef, Engine, Outcome};
use super::interrupt::ThreadInterrupt;
use super::oneshot::{OneShot, WaitError};
use super::scheduler::Scheduler;
use crate::app::AppRef;
use crate::events::{Bus, Event, EventKind};

/// Handle and completion signal of the running root computation.
pub struct RootDriver {
    handle: CancelRef,
    signal: Arc<OneShot<Outcome>>,
}

impl RootDriver {
    /// Submits `app` to `engine` and returns immediately.
    pub fn submit(
        engine: &dyn Engine,
        app: AppRef,
        args: Vec<String>,
        compute: &ComputePool,
        scheduler: &Scheduler,
        bus: &Bus,
    ) -> Self {
        let signal = Arc::new(OneShot::new());
        let name: Arc<str> = Arc::from(app.name());

        bus.publish(Event::new(EventKind::RootSubmitted).with_task(Arc::clone(&name)));

        let on_complete = {
            let signal = Arc::clone(&signal);
            let bus = bus.clone();
            Box::new(move |outcome: Outcome| {
                signal.complete_with(outcome, |outcome| match outcome {
                    Ok(code) => bus.publish(
                        Event::new(EventKind::RootCompleted)
                            .with_task(Arc::clone(&name))
                            .with_exit_code(*code),
                    ),
                    Err(e) => bus.publish(
                        Event::new(EventKind::RootFailed)
                            .with_task(Arc::clone(&name))
                            .with_reason(e.to_string()),
                    ),
                });
            })
        };

        let handle = engine.submit(app, args, compute, scheduler, on_complete);
        Self { handle, signal }
    }

    /// Cancellation handle of the computation.
    pub fn handle(&self) -> &CancelRef {
        &self.handle
    }

    /// Completion signal shared with the shutdown sequence.
    pub fn signal(&self) -> &Arc<OneShot<Outcome>> {
        &self.signal
    }

    /// Blocks the calling thread (the one `interrupt` belongs to) until the outcome is available.
    pub fn wait(&self, interrupt: &ThreadInterrupt) -> Result<Outcome, WaitError> {
        self.signal.wait(interrupt)
    }
}
