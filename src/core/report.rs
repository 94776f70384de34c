//! # Exit code reporting.
//!
//! [`Termination`] is how a run ended, after the runtime released its
//! resources. [`Termination::report`] applies it to the process:
//!
//! | Termination              | Process effect                                        |
//! |--------------------------|-------------------------------------------------------|
//! | `Exit(code)`             | `std::process::exit(code)`                            |
//! | `Failed(e)`              | panic of the main thread with `e` (default reporting) |
//! | `Interrupted { signal }` | entry returns `128 + signal`, or `130` without one    |

use std::process::ExitCode;

use super::signals::ShutdownSignal;
use crate::error::AppError;

/// Exit status used when an interruption carries no signal number.
const INTERRUPTED_STATUS: u8 = 130;

/// Terminal result of [`AppRuntime::run`](crate::AppRuntime::run).
#[derive(Debug)]
pub enum Termination {
    /// The root computation finished with this exit code.
    Exit(i32),
    /// The root computation failed.
    Failed(AppError),
    /// The wait was cut short: the exit hook fired, the host abandoned the
    /// run, or the main thread was interrupted from outside.
    Interrupted {
        /// Signal that fired the exit hook, when there was one.
        signal: Option<ShutdownSignal>,
    },
}

impl Termination {
    /// Exit status this termination maps to; `None` for failures.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Termination::Exit(code) => Some(*code),
            Termination::Failed(_) => None,
            Termination::Interrupted { signal } => Some(interrupted_status(*signal).into()),
        }
    }

    /// True for [`Termination::Interrupted`].
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Termination::Interrupted { .. })
    }

    /// Applies the termination to the process.
    ///
    /// Only returns for `Interrupted`; the caller hands the code back from `main`.
    pub fn report(self) -> ExitCode {
        match self {
            Termination::Exit(code) => {
                tracing::debug!(code, "exiting");
                std::process::exit(code)
            }
            Termination::Failed(e) => {
                tracing::error!(label = e.as_label(), error = %e, "root computation failed");
                panic!("{e}")
            }
            Termination::Interrupted { signal } => ExitCode::from(interrupted_status(signal)),
        }
    }
}

fn interrupted_status(signal: Option<ShutdownSignal>) -> u8 {
    signal.map_or(INTERRUPTED_STATUS, |s| 128 + s.number() as u8)
}
