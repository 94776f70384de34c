//! # Function-backed app (`AppFn`)
//!
//! [`AppFn`] wraps a closure `F: Fn(Vec<String>) -> Fut`, producing the root
//! future from the process arguments.
//!
//! ## Example
//! ```rust
//! use ioapp::{AppFn, AppRef, AppError};
//!
//! let app: AppRef = AppFn::arc("count-args", |args: Vec<String>| async move {
//!     Ok::<_, AppError>(args.len() as i32)
//! });
//!
//! assert_eq!(app.name(), "count-args");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::app::App;
use crate::error::AppError;

/// Shared handle to a root computation.
pub type AppRef = Arc<dyn App>;

/// Function-backed app implementation.
#[derive(Debug)]
pub struct AppFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> AppFn<F> {
    /// Creates a new function-backed app.
    ///
    /// Prefer [`AppFn::arc`] when you immediately need an [`AppRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the app and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> App for AppFn<F>
where
    F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<i32, AppError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, args: Vec<String>) -> Result<i32, AppError> {
        (self.f)(args).await
    }
}
