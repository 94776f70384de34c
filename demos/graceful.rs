//! # Example: graceful
//!
//! A long-running root computation that owns a resource. Press Ctrl-C (or send
//! `SIGTERM`) and watch the runtime cancel it, wait for the resource guard to
//! drop, and only then tear the worker pool down.
//!
//! ## Flow
//! ```text
//! Ctrl-C ──► io-cancel-hook ──► ShutdownRequested
//!                 ├─► CancelRequested     (root future dropped at its next .await)
//!                 ├─► "connection closed" (guard's Drop runs on io-compute-N)
//!                 ├─► CancelAcknowledged
//!                 └─► ResourcesReleased ──► main returns 130
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example graceful
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ioapp::{App, AppError, AppRuntime, Config, LogWriter, Subscribe};
use tracing_subscriber::EnvFilter;

/// Stand-in for something that must be closed properly.
struct Connection;

impl Drop for Connection {
    fn drop(&mut self) {
        tracing::info!("connection closed");
    }
}

struct Server;

#[async_trait]
impl App for Server {
    fn name(&self) -> &str {
        "server"
    }

    async fn run(&self, _args: Vec<String>) -> Result<i32, AppError> {
        let _conn = Connection;
        let mut tick = 0u64;
        loop {
            ioapp::sleep(Duration::from_millis(500)).await;
            tick += 1;
            tracing::info!(tick, "serving");
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let cfg = Config {
        cancel_grace: Duration::from_secs(10),
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    AppRuntime::new(cfg, subs).main(Arc::new(Server))
}
