//! # Root computation types.
//!
//! - [`App`] - trait for the program's asynchronous root computation
//! - [`AppFn`] - closure-backed implementation
//! - [`AppRef`] - shared reference to an app (`Arc<dyn App>`)

mod app;
mod app_fn;

pub use app::App;
pub use app_fn::{AppFn, AppRef};
