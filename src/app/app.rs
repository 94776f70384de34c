//! # Root computation abstraction.
//!
//! This module defines the [`App`] trait: the single asynchronous computation
//! that represents a whole program. It receives the process arguments and
//! resolves to an exit code or an [`AppError`].
//!
//! Cancellation is driven by the runtime. When the process is asked to shut
//! down while `run` is in flight, the future is dropped at its next `.await`
//! point, which runs destructors of everything it owns. Apps that need an
//! explicit cleanup step can hold guards with `Drop` impls.

use async_trait::async_trait;

use crate::error::AppError;

/// # Asynchronous root computation.
///
/// An `App` has a stable [`name`](App::name) and an async [`run`](App::run)
/// method producing the process exit code.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use ioapp::{App, AppError};
///
/// struct Echo;
///
/// #[async_trait]
/// impl App for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn run(&self, args: Vec<String>) -> Result<i32, AppError> {
///         println!("{}", args.join(" "));
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait App: Send + Sync + 'static {
    /// Returns a stable, human-readable app name (used in events and logs).
    fn name(&self) -> &str {
        "main"
    }

    /// Runs the program logic with the process arguments (program name excluded).
    ///
    /// `Ok(code)` becomes the process exit status; `Err(e)` terminates the
    /// process abnormally with `e` as the cause.
    async fn run(&self, args: Vec<String>) -> Result<i32, AppError>;
}
