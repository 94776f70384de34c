//! # Cross-platform termination signal listening.
//!
//! [`Signals`] registers listeners once (so registration errors surface at
//! startup) and [`Signals::recv`] completes when the process receives a
//! termination signal.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! Registration must happen inside a tokio runtime context with the I/O driver
//! enabled; the exit hook enters its own runtime for that.

/// Termination signal that triggered the exit hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl ShutdownSignal {
    /// Conventional signal number (used for the `128 + n` exit status).
    pub fn number(self) -> i32 {
        match self {
            ShutdownSignal::Interrupt => 2,
            ShutdownSignal::Quit => 3,
            ShutdownSignal::Terminate => 15,
        }
    }

    /// Conventional signal name.
    pub fn name(self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Quit => "SIGQUIT",
            ShutdownSignal::Terminate => "SIGTERM",
        }
    }
}

/// Registered termination signal listeners.
#[cfg(unix)]
pub struct Signals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    /// Registers listeners for `SIGINT`, `SIGTERM` and `SIGQUIT`.
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Waits for the next termination signal.
    pub async fn recv(&mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.sigint.recv()  => ShutdownSignal::Interrupt,
            _ = self.sigterm.recv() => ShutdownSignal::Terminate,
            _ = self.sigquit.recv() => ShutdownSignal::Quit,
        }
    }
}

/// Registered termination signal listeners.
#[cfg(not(unix))]
pub struct Signals;

#[cfg(not(unix))]
impl Signals {
    /// Nothing to register ahead of time; Ctrl-C is awaited directly.
    pub fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    /// Waits for Ctrl-C. A listener failure never resolves.
    pub async fn recv(&mut self) -> ShutdownSignal {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "ctrl-c listener failed");
            std::future::pending::<()>().await;
        }
        ShutdownSignal::Interrupt
    }
}
