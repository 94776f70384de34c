//! Runtime core: provisioning, root driving and shutdown.
//!
//! The public entry is [`AppRuntime`]; everything else is exported for
//! embedders that plug in their own engine or host probe.
//!
//! Internal modules:
//! - [`compute`]: worker pool the root computation runs on;
//! - [`scheduler`]: dedicated timer thread and the ambient [`sleep`];
//! - [`monitor`]: best-effort unforked-host watcher;
//! - [`engine`]: task engine seam ([`Engine`], [`Cancel`]) and the tokio engine;
//! - [`driver`]: submits the root and blocks the main thread on its outcome;
//! - [`shutdown`]: the at-most-once shutdown sequence;
//! - [`hook`]: the `io-cancel-hook` thread that triggers it;
//! - [`report`]: maps the outcome to process effects;
//! - [`interrupt`], [`oneshot`]: thread interruption and the completion signal;
//! - [`signals`]: OS termination signal listening.

mod builder;
mod compute;
mod driver;
mod engine;
mod hook;
mod interrupt;
mod monitor;
mod oneshot;
mod priority;
mod report;
mod runtime;
mod scheduler;
mod shutdown;
mod signals;

pub use builder::AppRuntimeBuilder;
pub use compute::ComputePool;
pub use engine::{AckCallback, Cancel, CancelRef, CompletionCallback, Engine, FiberHandle, Outcome, TokioEngine};
pub use interrupt::ThreadInterrupt;
pub use monitor::{
    ActiveRun, HostProbe, InterruptMonitor, UnforkedHostProbe, clear_active_run,
    publish_active_run,
};
pub use oneshot::{OneShot, WaitError};
pub use report::Termination;
pub use runtime::AppRuntime;
pub use scheduler::{Scheduler, Sleep, TimerHandle, sleep};
pub use signals::ShutdownSignal;
