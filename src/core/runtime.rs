//! # AppRuntime: provisions the runtime, drives the root computation, tears down.
//!
//! [`AppRuntime`] is the process entry point. It owns the configuration, the
//! event [`Bus`], the task [`Engine`] and the host probe, and wires the
//! components for one run of a root computation.
//!
//! ## High-level architecture
//! ```text
//! run(app, args), on the calling ("main") thread:
//!
//!   ComputePool::provision()      io-compute-0 .. io-compute-N
//!   Scheduler::provision()        io-scheduler
//!   InterruptMonitor::try_install ioapp-sbt-unforked-interrupt-monitor   (optional)
//!   RootDriver::submit()          ──► Engine ──► compute pool
//!   ExitHook::install()           io-cancel-hook (signals / shutdown token)
//!   RootDriver::wait()            main thread parks here
//!
//! (a) outcome arrives:
//!   hook.deregister() ─► sequence.run() (no cancel) ─► Exit(code) / Failed(e)
//!
//! (b) hook fires first (io-cancel-hook):
//!   seal signal ─► cancel ─► wait ack ─► stop scheduler, compute ─► main.interrupt()
//!   main: wait interrupted ─► sequence.run() (already done) ─► Interrupted { signal }
//!
//! (c) main interrupted from elsewhere (monitor, embedder):
//!   main: sequence.run() inline ─► hook.deregister() ─► restore interrupt flag ─► Interrupted
//! ```
//!
//! ## Example
//! ```no_run
//! use ioapp::{AppFn, AppRuntime, Config};
//!
//! fn main() -> std::process::ExitCode {
//!     let app = AppFn::arc("hello", |args: Vec<String>| async move {
//!         println!("hello {}", args.join(" "));
//!         Ok(0)
//!     });
//!
//!     AppRuntime::builder(Config::default()).build().main(app)
//! }
//! ```

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::builder::AppRuntimeBuilder;
use super::compute::ComputePool;
use super::driver::RootDriver;
use super::engine::Engine;
use super::hook::ExitHook;
use super::interrupt::ThreadInterrupt;
use super::monitor::{HostProbe, InterruptMonitor};
use super::report::Termination;
use super::scheduler::Scheduler;
use super::shutdown::{ShutdownReport, ShutdownSequence};
use crate::app::AppRef;
use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Entry-point runtime for a single root computation per run.
pub struct AppRuntime {
    cfg: Config,
    bus: Bus,
    engine: Arc<dyn Engine>,
    probe: Arc<dyn HostProbe>,
    shutdown: CancellationToken,
}

impl AppRuntime {
    /// Creates a runtime with the given config and subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self::builder(cfg).with_subscribers(subscribers).build()
    }

    /// Starts building a runtime.
    pub fn builder(cfg: Config) -> AppRuntimeBuilder {
        AppRuntimeBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: Config,
        bus: Bus,
        engine: Arc<dyn Engine>,
        probe: Arc<dyn HostProbe>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            engine,
            probe,
            shutdown,
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus; subscribe before [`run`](Self::run) to observe a run.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Token that fires the exit hook when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs `app` to its end on the calling thread and releases every resource.
    ///
    /// Returns how the run ended without applying it to the process. Errors are
    /// limited to startup failures (threads or signal listeners); nothing keeps
    /// running after an error is returned.
    pub fn run(&self, app: AppRef, args: Vec<String>) -> Result<Termination, RuntimeError> {
        let main = ThreadInterrupt::current();

        let compute = Arc::new(ComputePool::provision(&self.cfg)?);
        let scheduler = match Scheduler::provision(&self.cfg) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                compute.shutdown();
                return Err(e);
            }
        };
        self.bus
            .publish(Event::new(EventKind::RuntimeStarted).with_workers(compute.workers()));

        let monitor = if self.cfg.detect_unforked_host {
            InterruptMonitor::try_install(self.probe.as_ref(), main.clone(), &self.cfg, &self.bus)
        } else {
            None
        };

        let driver = RootDriver::submit(
            self.engine.as_ref(),
            app,
            args,
            &compute,
            &scheduler,
            &self.bus,
        );
        let sequence = Arc::new(ShutdownSequence::new(
            Arc::clone(driver.handle()),
            Arc::clone(driver.signal()),
            Arc::clone(&compute),
            scheduler,
            &self.cfg,
            self.bus.clone(),
        ));

        let hook = match ExitHook::install(
            Arc::clone(&sequence),
            main.clone(),
            self.shutdown.clone(),
            &self.cfg,
            self.bus.clone(),
        ) {
            Ok(hook) => hook,
            Err(e) => {
                sequence.run();
                if let Some(monitor) = monitor {
                    monitor.stop();
                }
                return Err(e);
            }
        };

        let termination = match driver.wait(&main) {
            Ok(outcome) => {
                if !hook.deregister() {
                    // The hook fired anyway; it interrupts us once its run is done.
                    hook.join();
                    main.clear();
                }
                log_released(sequence.run());
                match outcome {
                    Ok(code) => Termination::Exit(code),
                    Err(e) => Termination::Failed(e),
                }
            }
            Err(_) => {
                // Not the hook's wake-up: the caller must see the flag on return.
                let from_elsewhere = !hook.has_woken_main();
                self.bus.publish(Event::new(EventKind::MainInterrupted));
                log_released(sequence.run());
                if !hook.deregister() {
                    // The hook's own wake-up lands after this join.
                    hook.join();
                    if !from_elsewhere {
                        main.clear();
                    }
                }
                if from_elsewhere {
                    main.restore();
                }
                Termination::Interrupted {
                    signal: hook.signal(),
                }
            }
        };

        if let Some(monitor) = monitor {
            monitor.stop();
        }
        tracing::debug!(?termination, "run finished");
        Ok(termination)
    }

    /// Runs `app` with the process arguments and applies the result to the process.
    ///
    /// Exits the process on success, panics with the failure on error, and
    /// returns the status to hand back from `main` when interrupted. Arguments
    /// that are not valid Unicode are converted lossily.
    pub fn main(&self, app: AppRef) -> ExitCode {
        let args = process_args(std::env::args_os().skip(1));
        match self.run(app, args) {
            Ok(termination) => termination.report(),
            Err(e) => {
                tracing::error!(label = e.as_label(), error = %e, "runtime failed to start");
                ExitCode::FAILURE
            }
        }
    }
}

fn log_released(report: ShutdownReport) {
    tracing::debug!(
        cancel_requested = report.cancel_requested,
        grace_exceeded = report.grace_exceeded,
        "resources released"
    );
}

/// Converts OS arguments to strings, replacing invalid Unicode with U+FFFD.
fn process_args(args: impl IntoIterator<Item = OsString>) -> Vec<String> {
    args.into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}
