//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber, and how to
//! drive shutdown from code with the runtime's shutdown token instead of a
//! signal.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] to time the shutdown phases.
//! - Use [`AppRuntime::run`] to observe the [`Termination`] without exiting.
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ioapp::{AppFn, AppRuntime, Config, Event, EventKind, Subscribe, Termination};
use parking_lot::Mutex;

/// Prints shutdown phases with the time elapsed since the shutdown request.
struct PhaseTimer {
    requested: Mutex<Option<Instant>>,
}

impl Subscribe for PhaseTimer {
    fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::ShutdownRequested => {
                *self.requested.lock() = Some(Instant::now());
                println!("[sub] shutdown requested: {}", ev.reason.as_deref().unwrap_or("-"));
            }
            EventKind::CancelRequested
            | EventKind::CancelAcknowledged
            | EventKind::GraceExceeded
            | EventKind::ResourcesReleased => {
                let since = self.requested.lock().map(|t| t.elapsed()).unwrap_or_default();
                println!("[sub] #{} {:?} after {since:?}", ev.seq, ev.kind);
            }
            EventKind::RootCompleted => {
                println!("[sub] root completed with {:?}", ev.exit_code);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "phase-timer"
    }
}

fn main() {
    let cfg = Config {
        worker_threads: 2,
        handle_signals: false,
        ..Config::default()
    };
    let timer = Arc::new(PhaseTimer {
        requested: Mutex::new(None),
    });
    let rt = AppRuntime::builder(cfg)
        .with_subscribers(vec![timer as Arc<dyn Subscribe>])
        .build();

    // Stop the program from the outside after one second.
    let token = rt.shutdown_token();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_secs(1));
        token.cancel();
    });

    let app = AppFn::arc("counter", |_args: Vec<String>| async move {
        for i in 0.. {
            println!("[app] tick {i}");
            ioapp::sleep(Duration::from_millis(300)).await;
        }
        Ok(0)
    });

    match rt.run(app, Vec::new()) {
        Ok(Termination::Interrupted { .. }) => println!("stopped from outside, as planned"),
        Ok(other) => println!("unexpected end: {other:?}"),
        Err(e) => eprintln!("runtime error: {}", e.as_message()),
    }
    let _ = stopper.join();
}
