//! # Example: hello
//!
//! The smallest ioapp program: the whole program is one async closure, its
//! return value becomes the process exit status.
//!
//! ## Run
//! ```bash
//! RUST_LOG=ioapp=debug cargo run --example hello -- world
//! echo $?   # 0
//! ```

use std::process::ExitCode;
use std::time::Duration;

use ioapp::{AppError, AppFn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_names(true)
        .init();

    ioapp::main(AppFn::arc("hello", |args: Vec<String>| async move {
        ioapp::sleep(Duration::from_millis(100)).await;
        if args.is_empty() {
            return Err(AppError::fail("usage: hello <name>..."));
        }
        println!("hello, {}!", args.join(" and "));
        Ok(0)
    }))
}
