//! Error types used by the ioapp runtime and root computations.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: errors raised by the entry-point runtime itself.
//! - [`AppError`]: the failure a root computation terminates with.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the ioapp runtime.
///
/// These represent failures in provisioning or tearing down the runtime,
/// never failures of the user computation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A runtime resource (thread, pool, signal driver) could not be created.
    #[error("failed to provision {what}: {source}")]
    Provision {
        /// Which resource failed.
        what: &'static str,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The root computation did not acknowledge cancellation within the grace period.
    #[error("cancellation not acknowledged within {grace:?}; tearing down anyway")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },

    /// Registering OS signal listeners failed.
    #[error("signal registration failed: {0}")]
    Signal(#[source] std::io::Error),

    /// A host probe could not inspect its host.
    #[error("host probe failed: {reason}")]
    HostProbe {
        /// What went wrong.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use ioapp::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5) };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Provision { .. } => "runtime_provision_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal_failed",
            RuntimeError::HostProbe { .. } => "runtime_host_probe_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::Provision { what, source } => format!("provision {what}: {source}"),
            RuntimeError::GraceExceeded { grace } => format!("grace exceeded after {grace:?}"),
            RuntimeError::Signal(e) => format!("signal: {e}"),
            RuntimeError::HostProbe { reason } => format!("host probe: {reason}"),
        }
    }

    /// Creates a [`RuntimeError::HostProbe`] for probe implementations.
    pub fn host_probe(reason: impl Into<String>) -> Self {
        RuntimeError::HostProbe {
            reason: reason.into(),
        }
    }

    pub(crate) fn provision(what: &'static str, source: std::io::Error) -> Self {
        RuntimeError::Provision { what, source }
    }
}

/// # Failure of a root computation.
///
/// Whatever the computation fails with is surfaced verbatim as the cause of the
/// process's abnormal termination.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AppError {
    /// Computation failed with a plain message.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Computation failed with an arbitrary error value.
    #[error(transparent)]
    Source(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Computation panicked; the panic payload is kept as text.
    #[error("root computation panicked: {message}")]
    Panicked {
        /// Panic payload rendered as a string.
        message: String,
    },

    /// Computation observed cancellation and stopped.
    #[error("root computation cancelled")]
    Canceled,
}

impl AppError {
    /// Builds [`AppError::Fail`] from anything printable.
    pub fn fail(error: impl Into<String>) -> Self {
        AppError::Fail {
            error: error.into(),
        }
    }

    /// Wraps any error type as [`AppError::Source`].
    ///
    /// # Example
    /// ```
    /// use ioapp::AppError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
    /// let err = AppError::from_error(io);
    /// assert_eq!(err.as_label(), "app_error");
    /// assert_eq!(err.to_string(), "config.toml");
    /// ```
    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AppError::Source(Box::new(error))
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            AppError::Fail { .. } => "app_failed",
            AppError::Source(_) => "app_error",
            AppError::Panicked { .. } => "app_panicked",
            AppError::Canceled => "app_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            AppError::Fail { error } => format!("error: {error}"),
            AppError::Source(e) => format!("error: {e}"),
            AppError::Panicked { message } => format!("panic: {message}"),
            AppError::Canceled => "cancelled".to_string(),
        }
    }

    /// Builds [`AppError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        AppError::Panicked { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        let err = AppError::from_panic(Box::new("boom"));
        assert_eq!(err.as_message(), "panic: boom");

        let err = AppError::from_panic(Box::new(String::from("owned")));
        assert!(matches!(err, AppError::Panicked { ref message } if message == "owned"));

        let err = AppError::from_panic(Box::new(42_u8));
        assert_eq!(err.as_label(), "app_panicked");
    }

    #[test]
    fn provision_error_keeps_source() {
        let err = RuntimeError::provision(
            "compute pool",
            std::io::Error::new(std::io::ErrorKind::Other, "no threads"),
        );
        assert_eq!(err.as_label(), "runtime_provision_failed");
        assert!(err.to_string().contains("compute pool"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn host_detection_error_has_label() {
        let err = RuntimeError::host_probe("cell missing");
        assert_eq!(err.as_label(), "runtime_host_probe_failed");
        assert_eq!(err.to_string(), "host probe failed: cell missing");
    }
}
