//! Run loop driving ticks at a fixed cadence.
//!
//! Responsibilities:
//! - Run the first tick immediately, then one per interval (missed ticks are
//!   skipped, never bursted).
//! - Stop after the tick budget derived from the configured duration, or on
//!   cancellation.
//! - Export exactly once after reaching a terminal state.
//!
//! Cancellation ends an inter-tick wait immediately. A tick already in
//! progress runs to completion (each fetch is bounded by the collector's
//! timeout), so the export always sees settled buffers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use corelib::InstrumentRegistry;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{Span, debug, error, field, info, instrument};

use crate::collector::{SampleCollector, TickReport};
use crate::export::{ExportResult, Exporter};
use crate::logger::warn_if_slow;
use crate::scheduler::state::SchedulerState;
use crate::source::QuoteSource;
use crate::state::RunState;

/// Result of one complete run.
#[derive(Debug)]
pub struct RunSummary {
    /// `Completed` or `Cancelled`.
    pub state: SchedulerState,
    pub ticks: u64,
    pub last_tick: Option<TickReport>,
    pub export: ExportResult,
    pub elapsed: Duration,
}

/// One scheduler per run; [`Scheduler::run`] consumes it.
pub struct Scheduler<S> {
    collector: SampleCollector<S>,
    exporter: Exporter,
    registry: Arc<InstrumentRegistry>,
    run: Arc<RunState>,
    state: watch::Sender<SchedulerState>,
}

impl<S: QuoteSource> Scheduler<S> {
    pub fn new(
        collector: SampleCollector<S>,
        exporter: Exporter,
        registry: Arc<InstrumentRegistry>,
        run: Arc<RunState>,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            collector,
            exporter,
            registry,
            run,
            state,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Observes state transitions after the scheduler has been moved into
    /// [`Scheduler::run`].
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Ticks before `Completed`: `max(1, floor(duration / interval))`, or
    /// `None` when the run is indefinite.
    pub fn tick_budget(&self) -> Option<u64> {
        let duration = self.run.duration()?;
        let interval = self.run.interval().as_millis().max(1);
        let ticks = duration.as_millis() / interval;
        Some(u64::try_from(ticks).unwrap_or(u64::MAX).max(1))
    }

    #[instrument(
        skip(self),
        fields(
            budget = ?self.tick_budget(),
            interval_ms = self.run.interval().as_millis() as u64,
            state = field::Empty
        )
    )]
    pub async fn run(self) -> RunSummary {
        let started = Instant::now();
        let budget = self.tick_budget();
        let interval = self.run.interval();
        let cancel = self.run.cancel_token().clone();

        self.transition(SchedulerState::Running);
        info!("monitoring started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut ticks = 0u64;
        let mut last_tick = None;

        let terminal = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break SchedulerState::Cancelled,
                _ = ticker.tick() => {}
            }

            let report = warn_if_slow(
                "tick",
                interval,
                self.collector.run_tick(&self.registry, &self.run),
            )
            .await;
            ticks += 1;
            last_tick = Some(report);

            if cancel.is_cancelled() {
                break SchedulerState::Cancelled;
            }
            if budget.is_some_and(|b| ticks >= b) {
                break SchedulerState::Completed;
            }
            debug!(ticks, "waiting for next tick");
        };

        self.transition(terminal);
        info!(state = %terminal, ticks, "monitoring stopped; exporting");

        let export = warn_if_slow("export", interval, self.export()).await;

        RunSummary {
            state: terminal,
            ticks,
            last_tick,
            export,
            elapsed: started.elapsed(),
        }
    }

    /// Writes the artifacts on the blocking pool; the export does
    /// synchronous file IO and fsyncs.
    async fn export(self) -> ExportResult {
        let dir = self.exporter.dir().to_path_buf();
        let Self {
            exporter,
            registry,
            run,
            ..
        } = self;

        match tokio::task::spawn_blocking(move || exporter.export(&run, &registry)).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "export task failed");
                ExportResult::aborted(&dir, &e.to_string())
            }
        }
    }

    fn transition(&self, next: SchedulerState) {
        let prev = self.state();
        debug_assert!(prev.can_become(next), "illegal transition {prev} -> {next}");
        self.state.send_replace(next);
        Span::current().record("state", next.as_str());
        debug!(from = %prev, to = %next, "scheduler state changed");
    }
}
