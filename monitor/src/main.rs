use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use corelib::InstrumentRegistry;
use monitor::{
    cli::Cli,
    collector::{CollectorConfig, SampleCollector},
    config::AppConfig,
    export::Exporter,
    gate::RateGate,
    logger::{TraceId, init_tracing, run_span},
    scheduler::{RunSummary, Scheduler},
    source::JupiterClient,
    state::RunState,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, warn};

/// Exit status for configuration errors.
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production || cli.log_json);

    let cfg = match AppConfig::from_env().and_then(|c| c.with_cli(&cli)) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(cfg).await {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: AppConfig) -> anyhow::Result<RunSummary> {
    let trace_id = TraceId::default();
    let span = run_span(&trace_id);

    let registry = Arc::new(InstrumentRegistry::solana_default().context("building registry")?);

    std::fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating {}", cfg.output_dir.display()))?;

    let source = Arc::new(
        JupiterClient::new(
            cfg.base_url.clone(),
            &cfg.api_key,
            cfg.fetch_timeout,
            cfg.quote_slippage_bps,
        )
        .context("building jupiter client")?,
    );

    let cancel = CancellationToken::new();
    let state = Arc::new(RunState::new(
        cfg.buffer_capacity(),
        cfg.interval,
        cfg.duration,
        cancel.clone(),
    ));

    let collector = SampleCollector::new(
        source,
        RateGate::new(cfg.request_delay),
        CollectorConfig {
            max_in_flight: cfg.max_in_flight,
            fetch_timeout: cfg.fetch_timeout,
            batch_prices: cfg.batch_prices,
        },
    );

    let scheduler = Scheduler::new(
        collector,
        Exporter::new(cfg.output_dir.clone()),
        Arc::clone(&registry),
        Arc::clone(&state),
    );

    spawn_interrupt_handler(cancel);

    info!(
        parent: &span,
        instruments = registry.len(),
        tokens = registry.tokens().count(),
        pairs = registry.pairs().count(),
        interval_secs = cfg.interval.as_secs(),
        duration_mins = cfg.duration.map(|d| d.as_secs() / 60),
        capacity = state.capacity(),
        output_dir = %cfg.output_dir.display(),
        "starting price monitor"
    );

    let summary = scheduler.run().instrument(span.clone()).await;
    span.record("state", summary.state.as_str());

    info!(
        parent: &span,
        instruments = state.instruments().len(),
        price_samples = count_samples(&state, false),
        quote_samples = count_samples(&state, true),
        output_dir = %cfg.output_dir.display(),
        "session summary"
    );

    Ok(summary)
}

/// First Ctrl-C cancels the run; the scheduler exports before returning.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received; finishing current tick");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for interrupt"),
        }
    });
}

fn count_samples(state: &RunState, quotes: bool) -> usize {
    state
        .snapshot_all()
        .values()
        .flatten()
        .filter(|s| s.is_quote() == quotes)
        .count()
}

fn report(summary: &RunSummary) {
    info!(
        state = %summary.state,
        ticks = summary.ticks,
        elapsed_secs = summary.elapsed.as_secs(),
        written = summary.export.written.len(),
        skipped = summary.export.skipped.len(),
        failed = summary.export.failures.len(),
        "run finished"
    );

    for path in summary.export.paths() {
        info!(path = %path.display(), "artifact");
    }
    for (kind, e) in &summary.export.failures {
        error!(artifact = %kind, error = %e, "artifact not written");
    }
}
