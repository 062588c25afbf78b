mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use corelib::InstrumentRegistry;
use monitor::collector::{CollectorConfig, SampleCollector};
use monitor::export::{ArtifactKind, Exporter};
use monitor::gate::RateGate;
use monitor::scheduler::{Scheduler, SchedulerState};
use monitor::state::RunState;
use tempfile::TempDir;

use support::{MockSource, registry, run_state};

struct Harness {
    scheduler: Scheduler<MockSource>,
    source: Arc<MockSource>,
    state: Arc<RunState>,
    _dir: TempDir,
}

fn harness(
    source: MockSource,
    reg: Arc<InstrumentRegistry>,
    interval: Duration,
    duration: Option<Duration>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(source);
    let state = run_state(interval, duration);

    let collector = SampleCollector::new(
        Arc::clone(&source),
        RateGate::unlimited(),
        CollectorConfig {
            fetch_timeout: Duration::from_secs(60),
            ..CollectorConfig::default()
        },
    );
    let scheduler = Scheduler::new(
        collector,
        Exporter::new(dir.path().join("out")),
        reg,
        Arc::clone(&state),
    );

    Harness {
        scheduler,
        source,
        state,
        _dir: dir,
    }
}

#[tokio::test(start_paused = true)]
async fn finite_run_completes_after_its_tick_budget() {
    let h = harness(
        MockSource::new(),
        registry(),
        Duration::from_secs(30),
        Some(Duration::from_secs(120)),
    );
    assert_eq!(h.scheduler.state(), SchedulerState::Idle);
    assert_eq!(h.scheduler.tick_budget(), Some(4));

    let states = h.scheduler.subscribe();
    let summary = h.scheduler.run().await;

    assert_eq!(summary.state, SchedulerState::Completed);
    assert_eq!(*states.borrow(), SchedulerState::Completed);
    assert_eq!(summary.ticks, 4);
    assert_eq!(h.source.batch_calls.load(Ordering::SeqCst), 4);
    assert_eq!(h.state.buffer(&"SOL".into()).unwrap().len(), 4);

    // Exactly one export, with all three artifacts.
    assert_eq!(h.state.counters().snapshot().exports, 1);
    assert_eq!(summary.export.written.len(), 3);
    assert!(summary.export.is_complete());
    for (_, path) in &summary.export.written {
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(!name.contains("_2"), "{name}");
    }
}

#[tokio::test(start_paused = true)]
async fn budget_rounds_down_but_never_below_one() {
    let short = harness(
        MockSource::new(),
        registry(),
        Duration::from_secs(45),
        Some(Duration::from_secs(60)),
    );
    assert_eq!(short.scheduler.tick_budget(), Some(1));

    let summary = short.scheduler.run().await;
    assert_eq!(summary.state, SchedulerState::Completed);
    assert_eq!(summary.ticks, 1);

    let long = harness(
        MockSource::new(),
        registry(),
        Duration::from_secs(30),
        Some(Duration::from_secs(600)),
    );
    assert_eq!(long.scheduler.tick_budget(), Some(20));

    let indefinite = harness(MockSource::new(), registry(), Duration::from_secs(30), None);
    assert_eq!(indefinite.scheduler.tick_budget(), None);
}

#[tokio::test(start_paused = true)]
async fn indefinite_run_ends_only_on_cancel() {
    let h = harness(MockSource::new(), registry(), Duration::from_secs(30), None);
    let cancel = h.state.cancel_token().clone();
    let mut states = h.scheduler.subscribe();

    let handle = tokio::spawn(h.scheduler.run());

    // Ticks at 0, 30, 60 and 90 seconds.
    tokio::time::sleep(Duration::from_secs(95)).await;
    assert_eq!(*states.borrow_and_update(), SchedulerState::Running);
    cancel.cancel();

    let summary = handle.await.unwrap();
    assert_eq!(summary.state, SchedulerState::Cancelled);
    assert_eq!(summary.ticks, 4);
    assert_eq!(h.state.counters().snapshot().exports, 1);
    assert!(summary.export.path(ArtifactKind::PriceHistory).is_some());
}

#[tokio::test(start_paused = true)]
async fn cancel_cuts_the_wait_short() {
    let h = harness(
        MockSource::new(),
        registry(),
        Duration::from_secs(3600),
        None,
    );
    let cancel = h.state.cancel_token().clone();
    let started = tokio::time::Instant::now();

    let handle = tokio::spawn(h.scheduler.run());
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    let summary = handle.await.unwrap();
    assert_eq!(summary.state, SchedulerState::Cancelled);
    assert_eq!(summary.ticks, 1);
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn tick_in_flight_finishes_before_cancelling() {
    let h = harness(
        MockSource::new().slow_all(Duration::from_secs(10)),
        registry(),
        Duration::from_secs(30),
        None,
    );
    let cancel = h.state.cancel_token().clone();

    let handle = tokio::spawn(h.scheduler.run());
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    let summary = handle.await.unwrap();
    assert_eq!(summary.state, SchedulerState::Cancelled);
    assert_eq!(summary.ticks, 1);

    let report = summary.last_tick.unwrap();
    assert_eq!(report.succeeded, 4);
    for id in ["SOL", "USDC", "JUP", "SOL/USDC"] {
        assert_eq!(h.state.buffer(&id.into()).unwrap().len(), 1, "{id}");
    }
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_first_tick_still_exports_once() {
    let h = harness(
        MockSource::new(),
        registry(),
        Duration::from_secs(30),
        Some(Duration::from_secs(600)),
    );
    h.state.cancel_token().cancel();

    let summary = h.scheduler.run().await;

    assert_eq!(summary.state, SchedulerState::Cancelled);
    assert_eq!(summary.ticks, 0);
    assert_eq!(h.source.calls(), 0);
    assert_eq!(h.state.counters().snapshot().exports, 1);
    assert!(summary.export.written.is_empty());
    assert_eq!(summary.export.skipped.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn persistent_failures_never_stop_the_run() {
    let h = harness(
        MockSource::new()
            .failing("SOL", monitor::error::FetchError::RateLimited)
            .failing("SOL/USDC", monitor::error::FetchError::Upstream { status: 503 }),
        registry(),
        Duration::from_secs(30),
        Some(Duration::from_secs(300)),
    );

    let summary = h.scheduler.run().await;

    assert_eq!(summary.state, SchedulerState::Completed);
    assert_eq!(summary.ticks, 10);
    assert!(h.state.buffer(&"SOL".into()).is_none());
    assert_eq!(h.state.buffer(&"JUP".into()).unwrap().len(), 10);
    assert_eq!(h.state.counters().snapshot().fetch_failed, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn export_runs_off_the_async_workers() {
    let h = harness(
        MockSource::new(),
        registry(),
        Duration::from_millis(20),
        Some(Duration::from_millis(40)),
    );

    let summary = h.scheduler.run().await;

    assert_eq!(summary.state, SchedulerState::Completed);
    assert!(summary.export.is_complete());
    assert_eq!(summary.export.written.len(), 3);
    for (_, path) in &summary.export.written {
        assert!(path.exists());
    }
}
