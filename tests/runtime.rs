use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use ioapp::{
    AckCallback, ActiveRun, AppError, AppFn, AppRef, AppRuntime, Cancel, CancelRef,
    CompletionCallback, ComputePool, Config, Engine, Event, EventKind, HostProbe, RuntimeError,
    Scheduler,
    ShutdownSignal, Subscribe, Termination, ThreadInterrupt, UnforkedHostProbe, clear_active_run,
    publish_active_run,
};
use parking_lot::Mutex;
use serial_test::serial;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Recorder {
    kinds: Mutex<Vec<EventKind>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.kinds.lock().clone()
    }

    fn count(&self, kind: EventKind) -> usize {
        self.kinds.lock().iter().filter(|k| **k == kind).count()
    }

    fn position(&self, kind: EventKind) -> Option<usize> {
        self.kinds.lock().iter().position(|k| *k == kind)
    }
}

impl Subscribe for Recorder {
    fn on_event(&self, e: &Event) {
        self.kinds.lock().push(e.kind);
    }
}

fn cfg() -> Config {
    Config {
        worker_threads: 2,
        cancel_grace: Duration::from_secs(5),
        teardown_timeout: Duration::from_secs(1),
        monitor_interval: Duration::from_millis(10),
        detect_unforked_host: false,
        handle_signals: false,
        ..Config::default()
    }
}

fn runtime(cfg: Config) -> (AppRuntime, Arc<Recorder>) {
    let rec = Arc::new(Recorder::default());
    let rt = AppRuntime::builder(cfg)
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build();
    (rt, rec)
}

fn never_ending(dropped: Arc<AtomicBool>) -> AppRef {
    struct Guard(Arc<AtomicBool>);
    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    AppFn::arc("forever", move |_args: Vec<String>| {
        let guard = Guard(Arc::clone(&dropped));
        async move {
            let _guard = guard;
            std::future::pending::<()>().await;
            Ok(0)
        }
    })
}

#[test]
fn normal_completion_exits_with_code() {
    let (rt, rec) = runtime(cfg());
    let app = AppFn::arc("args", |args: Vec<String>| async move { Ok(args.len() as i32 + 5) });

    let t = rt.run(app, vec!["x".into(), "y".into()]).unwrap();
    assert!(matches!(t, Termination::Exit(7)));

    assert_eq!(rec.count(EventKind::CancelRequested), 0);
    assert_eq!(rec.count(EventKind::ShutdownRequested), 0);
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
    assert!(rec.position(EventKind::HookDeregistered) < rec.position(EventKind::ResourcesReleased));
    assert!(!ThreadInterrupt::current().is_interrupted());
}

#[test]
fn runtime_started_reports_pool_size() {
    let (rt, _rec) = runtime(cfg());
    let mut rx = rt.bus().subscribe();
    let app = AppFn::arc("noop", |_args: Vec<String>| async move { Ok(0) });

    rt.run(app, vec![]).unwrap();
    let started = rx.try_recv().unwrap();
    assert_eq!(started.kind, EventKind::RuntimeStarted);
    assert_eq!(started.workers, Some(2));
}

#[test]
fn failure_is_reported_after_release() {
    let (rt, rec) = runtime(cfg());
    let app = AppFn::arc("broken", |_args: Vec<String>| async move {
        Err::<i32, _>(AppError::fail("boom"))
    });

    let t = rt.run(app, vec![]).unwrap();
    let Termination::Failed(err) = t else {
        panic!("expected failure, got {t:?}");
    };
    assert_eq!(err.to_string(), "execution failed: boom");
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
    assert!(rec.position(EventKind::RootFailed) < rec.position(EventKind::ResourcesReleased));
}

#[test]
fn panicking_root_becomes_failure() {
    let (rt, _rec) = runtime(cfg());
    let app = AppFn::arc("panics", |_args: Vec<String>| async move {
        if true {
            panic!("root exploded");
        }
        Ok(0)
    });

    let t = rt.run(app, vec![]).unwrap();
    assert!(matches!(t, Termination::Failed(AppError::Panicked { ref message }) if message == "root exploded"));
}

#[test]
fn shutdown_before_completion_cancels_then_releases() {
    let (rt, rec) = runtime(cfg());
    let dropped = Arc::new(AtomicBool::new(false));
    let token = rt.shutdown_token();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        token.cancel();
    });

    let t = rt.run(never_ending(dropped.clone()), vec![]).unwrap();
    trigger.join().unwrap();

    assert!(matches!(t, Termination::Interrupted { signal: None }));
    assert_eq!(t.exit_code(), Some(130));
    assert!(dropped.load(Ordering::SeqCst));

    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    assert_eq!(rec.count(EventKind::CancelRequested), 1);
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
    assert_eq!(rec.count(EventKind::RootCompleted), 0);
    let ack = rec.position(EventKind::CancelAcknowledged).expect("acknowledged");
    let released = rec.position(EventKind::ResourcesReleased).expect("released");
    assert!(ack < released, "events: {:?}", rec.kinds());

    // The hook's wake-up is consumed; the caller's thread is left clean.
    assert!(!ThreadInterrupt::current().is_interrupted());
}

#[test]
fn shutdown_after_completion_is_a_noop() {
    let (rt, rec) = runtime(cfg());
    let app = AppFn::arc("quick", |_args: Vec<String>| async move { Ok(0) });

    let t = rt.run(app, vec![]).unwrap();
    rt.shutdown_token().cancel();
    thread::sleep(Duration::from_millis(30));

    assert!(matches!(t, Termination::Exit(0)));
    assert_eq!(rec.count(EventKind::ShutdownRequested), 0);
    assert_eq!(rec.count(EventKind::CancelRequested), 0);
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
}

#[test]
fn racing_completion_and_shutdown_yield_one_outcome() {
    let base = Config {
        worker_threads: 1,
        ..cfg()
    };

    for trial in 0..1000u64 {
        let (rt, rec) = runtime(base.clone());
        let token = rt.shutdown_token();
        let delay = Duration::from_micros((trial % 40) * 10);
        let trigger = thread::spawn(move || {
            thread::sleep(delay);
            token.cancel();
        });

        let app = AppFn::arc("racer", |_args: Vec<String>| async move {
            tokio::task::yield_now().await;
            Ok(1)
        });
        let t = rt.run(app, vec![]).unwrap();
        trigger.join().unwrap();

        let completed = rec.count(EventKind::RootCompleted);
        let cancelled = rec.count(EventKind::CancelRequested);
        match t {
            Termination::Exit(1) => assert_eq!((completed, cancelled), (1, 0), "trial {trial}"),
            Termination::Interrupted { .. } => {
                assert_eq!((completed, cancelled), (0, 1), "trial {trial}")
            }
            other => panic!("trial {trial}: unexpected {other:?}"),
        }
        assert_eq!(rec.count(EventKind::ResourcesReleased), 1, "trial {trial}");
        assert!(!ThreadInterrupt::current().is_interrupted(), "trial {trial}");
    }
}

struct Broken;

impl HostProbe for Broken {
    fn detect(&self) -> Result<Option<Arc<dyn ActiveRun>>, RuntimeError> {
        Err(RuntimeError::host_probe("host internals are not where they used to be"))
    }
}

#[test]
fn failing_detection_never_blocks_a_normal_run() {
    let cfg = Config {
        detect_unforked_host: true,
        ..cfg()
    };
    let rt = AppRuntime::builder(cfg.clone()).with_probe(Arc::new(Broken)).build();
    let app = AppFn::arc("five", |_args: Vec<String>| async move { Ok(5) });
    assert!(matches!(rt.run(app, vec![]).unwrap(), Termination::Exit(5)));

    // Default probe on a plain test thread: nothing detected.
    let (rt, rec) = runtime(cfg);
    let app = AppFn::arc("six", |_args: Vec<String>| async move { Ok(6) });
    assert!(matches!(rt.run(app, vec![]).unwrap(), Termination::Exit(6)));
    assert_eq!(rec.count(EventKind::MonitorInstalled), 0);
}

struct Fixed(Arc<AtomicBool>);

impl HostProbe for Fixed {
    fn detect(&self) -> Result<Option<Arc<dyn ActiveRun>>, RuntimeError> {
        Ok(Some(self.0.clone() as Arc<dyn ActiveRun>))
    }
}

#[test]
fn abandoned_host_run_interrupts_main() {
    let cfg = Config {
        detect_unforked_host: true,
        ..cfg()
    };
    let active = Arc::new(AtomicBool::new(true));
    let rec = Arc::new(Recorder::default());
    let rt = AppRuntime::builder(cfg)
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .with_probe(Arc::new(Fixed(active.clone())))
        .build();

    let host = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        active.store(false, Ordering::SeqCst);
    });
    let dropped = Arc::new(AtomicBool::new(false));
    let t = rt.run(never_ending(dropped.clone()), vec![]).unwrap();
    host.join().unwrap();

    assert!(matches!(t, Termination::Interrupted { signal: None }));
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(rec.count(EventKind::MonitorInstalled), 1);
    assert_eq!(rec.count(EventKind::HostRunEnded), 1);
    assert_eq!(rec.count(EventKind::MainInterrupted), 1);
    assert_eq!(rec.count(EventKind::CancelRequested), 1);
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
    assert_eq!(rec.count(EventKind::HookDeregistered), 1);

    // Interrupted status is handed back to the caller.
    let me = ThreadInterrupt::current();
    assert!(me.is_interrupted());
    me.clear();
}

#[test]
fn external_interrupt_runs_shutdown_inline_once() {
    let (rt, rec) = runtime(cfg());
    let me = ThreadInterrupt::current();
    let remote = me.clone();
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.interrupt();
    });

    let dropped = Arc::new(AtomicBool::new(false));
    let t = rt.run(never_ending(dropped.clone()), vec![]).unwrap();
    interrupter.join().unwrap();

    assert!(t.is_interrupted());
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(rec.count(EventKind::ShutdownRequested), 0);
    assert_eq!(rec.count(EventKind::CancelRequested), 1);
    assert_eq!(rec.count(EventKind::CancelAcknowledged), 1);
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
    assert!(me.clear());

    // The hook is gone: a late shutdown request does nothing.
    rt.shutdown_token().cancel();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
    assert!(!me.is_interrupted());
}

/// Engine whose computations neither finish nor acknowledge cancellation.
struct Stubborn {
    cancels: Arc<AtomicUsize>,
}

struct StubbornFiber(Arc<AtomicUsize>);

impl Cancel for StubbornFiber {
    fn cancel(&self, _on_ack: AckCallback) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl Engine for Stubborn {
    fn submit(
        &self,
        _app: AppRef,
        _args: Vec<String>,
        _compute: &ComputePool,
        _scheduler: &Scheduler,
        _on_complete: CompletionCallback,
    ) -> CancelRef {
        Arc::new(StubbornFiber(Arc::clone(&self.cancels)))
    }
}

#[test]
fn unacknowledged_cancel_is_bounded_by_grace() {
    let cfg = Config {
        cancel_grace: Duration::from_millis(50),
        ..cfg()
    };
    let cancels = Arc::new(AtomicUsize::new(0));
    let rec = Arc::new(Recorder::default());
    let rt = AppRuntime::builder(cfg)
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .with_engine(Arc::new(Stubborn {
            cancels: Arc::clone(&cancels),
        }))
        .build();

    let token = rt.shutdown_token();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        token.cancel();
    });
    let app = AppFn::arc("ignored", |_args: Vec<String>| async move { Ok(0) });
    let t = rt.run(app, vec![]).unwrap();
    trigger.join().unwrap();

    assert!(t.is_interrupted());
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert_eq!(rec.count(EventKind::GraceExceeded), 1);
    assert_eq!(rec.count(EventKind::CancelAcknowledged), 0);
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
}

/// Engine whose cancellation also fires the exit hook before acknowledging.
struct Overlapping {
    shutdown: CancellationToken,
}

struct OverlappingFiber(CancellationToken);

impl Cancel for OverlappingFiber {
    fn cancel(&self, on_ack: AckCallback) {
        self.0.cancel();
        thread::sleep(Duration::from_millis(100));
        on_ack();
    }
}

impl Engine for Overlapping {
    fn submit(
        &self,
        _app: AppRef,
        _args: Vec<String>,
        _compute: &ComputePool,
        _scheduler: &Scheduler,
        _on_complete: CompletionCallback,
    ) -> CancelRef {
        Arc::new(OverlappingFiber(self.shutdown.clone()))
    }
}

#[test]
fn outside_interrupt_survives_a_concurrent_hook() {
    let shutdown = CancellationToken::new();
    let rec = Arc::new(Recorder::default());
    let rt = AppRuntime::builder(cfg())
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .with_engine(Arc::new(Overlapping {
            shutdown: shutdown.clone(),
        }))
        .with_shutdown_token(shutdown)
        .build();

    let me = ThreadInterrupt::current();
    let remote = me.clone();
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.interrupt();
    });
    let app = AppFn::arc("ignored", |_args: Vec<String>| async move { Ok(0) });
    let t = rt.run(app, vec![]).unwrap();
    interrupter.join().unwrap();

    assert!(matches!(t, Termination::Interrupted { signal: None }));
    assert_eq!(rec.count(EventKind::MainInterrupted), 1);
    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    assert_eq!(rec.count(EventKind::CancelRequested), 1);
    assert_eq!(rec.count(EventKind::ResourcesReleased), 1);
    assert_eq!(rec.count(EventKind::HookDeregistered), 0);

    // The hook fired too, but the caller's interruption is handed back.
    assert!(me.is_interrupted());
    me.clear();
}

#[cfg(unix)]
#[test]
#[serial]
fn sigterm_cancels_root_and_maps_to_status() {
    let cfg = Config {
        handle_signals: true,
        ..cfg()
    };
    let (rt, rec) = runtime(cfg);
    let raiser = thread::spawn(|| {
        thread::sleep(Duration::from_millis(50));
        // SAFETY: `raise` only delivers a signal to this process; the hook's
        // listener is registered before `run` starts waiting.
        unsafe {
            libc::raise(libc::SIGTERM);
        }
    });

    let dropped = Arc::new(AtomicBool::new(false));
    let t = rt.run(never_ending(dropped.clone()), vec![]).unwrap();
    raiser.join().unwrap();

    assert!(matches!(
        t,
        Termination::Interrupted {
            signal: Some(ShutdownSignal::Terminate)
        }
    ));
    assert_eq!(t.exit_code(), Some(143));
    assert!(dropped.load(Ordering::SeqCst));

    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    assert_eq!(rec.count(EventKind::CancelRequested), 1);
    let ack = rec.position(EventKind::CancelAcknowledged).expect("acknowledged");
    let released = rec.position(EventKind::ResourcesReleased).expect("released");
    assert!(ack < released, "events: {:?}", rec.kinds());
    assert!(!ThreadInterrupt::current().is_interrupted());
}

#[test]
fn root_runs_on_compute_workers_with_ambient_timer() {
    let (rt, _rec) = runtime(cfg());
    let app = AppFn::arc("where", |_args: Vec<String>| async move {
        ioapp::sleep(Duration::from_millis(5)).await;
        let on_compute = thread::current()
            .name()
            .is_some_and(|n| n.starts_with("io-compute-"));
        let has_timer = Scheduler::current().is_some();
        Ok(i32::from(on_compute) * 10 + i32::from(has_timer))
    });

    assert!(matches!(rt.run(app, vec![]).unwrap(), Termination::Exit(11)));
}

#[test]
#[serial]
fn unforked_host_run_is_watched_through_published_cell() {
    let active = Arc::new(AtomicBool::new(true));
    publish_active_run(active.clone());

    let runner = thread::Builder::new()
        .name("run-main-0".into())
        .spawn(move || {
            let cfg = Config {
                detect_unforked_host: true,
                ..cfg()
            };
            let rec = Arc::new(Recorder::default());
            let rt = AppRuntime::builder(cfg)
                .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
                .with_probe(Arc::new(UnforkedHostProbe::new("run-main")))
                .build();

            let app = AppFn::arc("hosted", |_args: Vec<String>| async move { Ok(0) });
            let t = rt.run(app, vec![]).unwrap();
            (t.exit_code(), rec.count(EventKind::MonitorInstalled))
        })
        .unwrap();

    let (code, installed) = runner.join().unwrap();
    clear_active_run();
    assert_eq!(code, Some(0));
    assert_eq!(installed, 1);
    assert!(active.load(Ordering::SeqCst));
}
