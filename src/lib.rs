//! # ioapp
//!
//! **ioapp** is a process entry-point runtime for asynchronous programs.
//!
//! A whole program is one asynchronous root computation ([`App`]). ioapp
//! provisions the threads it runs on, drives it to completion from the
//! process's main thread, turns its outcome into the process exit status, and
//! makes sure an external shutdown request cancels it cleanly before the
//! process goes away.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                       ┌──────────────────────────┐
//!                       │  App::run(args) (user)   │
//!                       └────────────┬─────────────┘
//!                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  AppRuntime (main thread)                                         │
//! │  - ComputePool      io-compute-0..N   runs the root computation   │
//! │  - Scheduler        io-scheduler      delayed callbacks, sleep()  │
//! │  - InterruptMonitor ioapp-sbt-unforked-interrupt-monitor (opt.)   │
//! │  - ExitHook         io-cancel-hook    signals / shutdown token    │
//! │  - RootDriver       OneShot completion signal, main thread waits  │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        │ Publishes        │                  │               │
//!        │ - RuntimeStarted │ - RootCompleted  │ - Shutdown    │ - Resources
//!        │ - RootSubmitted  │ - RootFailed     │   Requested   │   Released
//!        ▼                  ▼                  ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │              Bus (broadcast channel + SubscriberSet)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       LogWriter / custom Subscribe
//! ```
//!
//! ### Lifecycle
//! ```text
//! provision compute ─► provision scheduler ─► (monitor) ─► submit root ─► install hook ─► wait
//!
//! root finishes first:   deregister hook ─► release resources ─► exit(code) | panic(error)
//! hook fires first:      cancel root ─► wait ack (≤ cancel_grace) ─► release ─► wake main
//! main interrupted:      run shutdown inline ─► deregister hook ─► restore interrupt flag
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                       |
//! |-------------------|--------------------------------------------------------------|------------------------------------------|
//! | **Root**          | Define the program as one async computation.                 | [`App`], [`AppFn`], [`AppRef`]           |
//! | **Runtime**       | Provision, drive, shut down, report.                         | [`AppRuntime`], [`Termination`]          |
//! | **Engine**        | Plug in the executor that runs and cancels the root.         | [`Engine`], [`Cancel`], [`TokioEngine`]  |
//! | **Host probes**   | Detect in-process build tool runners.                        | [`HostProbe`], [`UnforkedHostProbe`]     |
//! | **Timers**        | Sleep on the dedicated timer thread.                         | [`sleep`], [`Scheduler`]                 |
//! | **Subscriber API**| Observe lifecycle events.                                    | [`Subscribe`], [`Event`], [`EventKind`]  |
//! | **Errors**        | Typed errors for the runtime and the root computation.       | [`RuntimeError`], [`AppError`]           |
//! | **Configuration** | Centralize runtime settings.                                 | [`Config`]                               |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] and makes
//!   [`main`] log lifecycle events through `tracing`.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use ioapp::{AppError, AppFn};
//!
//! fn main() -> std::process::ExitCode {
//!     ioapp::main(AppFn::arc("hello", |args: Vec<String>| async move {
//!         ioapp::sleep(Duration::from_millis(10)).await;
//!         println!("hello {}", args.join(" "));
//!         Ok::<_, AppError>(0)
//!     }))
//! }
//! ```

mod app;
mod config;
mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use app::{App, AppFn, AppRef};
pub use config::Config;
pub use crate::core::{
    AckCallback, ActiveRun, AppRuntime, AppRuntimeBuilder, Cancel, CancelRef, CompletionCallback,
    ComputePool, Engine, FiberHandle, HostProbe, InterruptMonitor, OneShot, Outcome, Scheduler,
    ShutdownSignal, Sleep, Termination, ThreadInterrupt, TimerHandle, TokioEngine,
    UnforkedHostProbe, WaitError, clear_active_run, publish_active_run, sleep,
};
pub use error::{AppError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

use std::process::ExitCode;
use std::sync::Arc;

/// Runs `app` as the whole program with the default [`Config`].
///
/// Equivalent to `AppRuntime::builder(Config::default()).build().main(app)`,
/// plus a [`LogWriter`] subscriber when the `logging` feature is enabled.
pub fn main(app: AppRef) -> ExitCode {
    #[allow(unused_mut)]
    let mut subs: Vec<Arc<dyn Subscribe>> = Vec::new();
    #[cfg(feature = "logging")]
    subs.push(Arc::new(LogWriter::new()));

    AppRuntime::new(Config::default(), subs).main(app)
}
