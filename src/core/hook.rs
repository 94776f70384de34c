//! # Process-exit hook.
//!
//! [`ExitHook`] owns the `io-cancel-hook` thread. The thread waits for a
//! termination request and then runs the [`ShutdownSequence`] on its own,
//! while the main thread may still be parked waiting for the root outcome.
//!
//! ## Triggers
//! - `SIGINT`, `SIGTERM`, `SIGQUIT` (unix; Ctrl-C elsewhere) when
//!   `Config::handle_signals` is set;
//! - cancellation of the embedder's shutdown [`CancellationToken`].
//!
//! ## Flow
//! ```text
//! io-cancel-hook:  wait trigger ──► claim registration ──► ShutdownRequested
//!                                        │                       │
//!                                        │ (lost: deregistered)  ▼
//!                                        └──► return       sequence.run()
//!                                                                │
//!                                                                ▼
//!                                                        main.interrupt()
//!
//! main thread:     deregister() ──► claim registration ──► stop hook thread ──► HookDeregistered
//! ```
//!
//! Registration is a single flag claimed with a swap, so exactly one of
//! "hook fired" and "hook deregistered" wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;

use super::interrupt::ThreadInterrupt;
use super::shutdown::ShutdownSequence;
use super::signals::{ShutdownSignal, Signals};
use crate::config::{Config, HOOK_THREAD_NAME};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

enum Trigger {
    Signal(ShutdownSignal),
    Token,
}

struct Shared {
    registered: AtomicBool,
    fired: OnceLock<Option<ShutdownSignal>>,
    woke_main: AtomicBool,
}

/// Registered process-exit hook.
pub struct ExitHook {
    shared: Arc<Shared>,
    dereg: CancellationToken,
    thread: Mutex<Option<JoinHandle<()>>>,
    bus: Bus,
}

impl ExitHook {
    /// Registers the hook and starts its thread.
    ///
    /// Signal listeners are registered before this returns, so a registration
    /// failure is reported here rather than lost on the hook thread.
    pub fn install(
        sequence: Arc<ShutdownSequence>,
        main: ThreadInterrupt,
        external: CancellationToken,
        cfg: &Config,
        bus: Bus,
    ) -> Result<Self, RuntimeError> {
        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RuntimeError::provision("exit hook runtime", e))?;

        let mut signals = if cfg.handle_signals {
            let _guard = rt.enter();
            Some(Signals::register().map_err(RuntimeError::Signal)?)
        } else {
            None
        };

        let shared = Arc::new(Shared {
            registered: AtomicBool::new(true),
            fired: OnceLock::new(),
            woke_main: AtomicBool::new(false),
        });
        let dereg = CancellationToken::new();

        let thread = {
            let shared = Arc::clone(&shared);
            let dereg = dereg.clone();
            let bus = bus.clone();
            thread::Builder::new()
                .name(HOOK_THREAD_NAME.to_string())
                .spawn(move || {
                    let trigger = rt.block_on(async {
                        tokio::select! {
                            biased;
                            _ = dereg.cancelled() => None,
                            _ = external.cancelled() => Some(Trigger::Token),
                            s = next_signal(&mut signals) => Some(Trigger::Signal(s)),
                        }
                    });
                    drop(signals);
                    drop(rt);

                    let Some(trigger) = trigger else {
                        return;
                    };
                    if !shared.registered.swap(false, Ordering::SeqCst) {
                        return;
                    }

                    let ev = match trigger {
                        Trigger::Signal(s) => {
                            let _ = shared.fired.set(Some(s));
                            Event::new(EventKind::ShutdownRequested)
                                .with_signal(s.number())
                                .with_reason(s.name())
                        }
                        Trigger::Token => {
                            let _ = shared.fired.set(None);
                            Event::new(EventKind::ShutdownRequested)
                                .with_reason("shutdown token cancelled")
                        }
                    };
                    bus.publish(ev);

                    sequence.run();
                    shared.woke_main.store(true, Ordering::SeqCst);
                    main.interrupt();
                })
                .map_err(|e| RuntimeError::provision("exit hook thread", e))?
        };

        tracing::debug!(signals = cfg.handle_signals, "exit hook installed");
        Ok(Self {
            shared,
            dereg,
            thread: Mutex::new(Some(thread)),
            bus,
        })
    }

    /// Removes the hook so it can no longer fire.
    ///
    /// Returns `false` if the hook already fired (or was deregistered before);
    /// in that case the hook owns the shutdown sequence.
    pub fn deregister(&self) -> bool {
        if !self.shared.registered.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.dereg.cancel();
        self.join();
        self.bus.publish(Event::new(EventKind::HookDeregistered));
        true
    }

    /// Waits for the hook thread to exit (no-op when called from it).
    pub fn join(&self) {
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        if thread.thread().id() != thread::current().id() {
            let _ = thread.join();
        }
    }

    /// True once the hook claimed the shutdown.
    pub fn has_fired(&self) -> bool {
        self.shared.fired.get().is_some()
    }

    /// True once the hook finished its run and interrupted the main thread.
    pub fn has_woken_main(&self) -> bool {
        self.shared.woke_main.load(Ordering::SeqCst)
    }

    /// Signal that fired the hook, if it was a signal.
    pub fn signal(&self) -> Option<ShutdownSignal> {
        self.shared.fired.get().copied().flatten()
    }
}

impl Drop for ExitHook {
    fn drop(&mut self) {
        self.dereg.cancel();
    }
}

async fn next_signal(signals: &mut Option<Signals>) -> ShutdownSignal {
    match signals {
        Some(signals) => signals.recv().await,
        None => std::future::pending().await,
    }
}
