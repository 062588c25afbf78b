//! One tick: fan out fetches for every registered instrument, fan the
//! results back into the run's buffers.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use corelib::{Instrument, InstrumentId, InstrumentRegistry, Sample};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use tracing::{Instrument as _, info, warn};

use crate::error::{FetchError, FetchErrorKind};
use crate::gate::RateGate;
use crate::logger::tick_span;
use crate::source::QuoteSource;
use crate::state::RunState;

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Upper bound on fetches running at once within a tick.
    pub max_in_flight: usize,
    pub fetch_timeout: Duration,
    /// Fetch all token prices in one request instead of one per token.
    /// Ignored for sources that cannot batch.
    pub batch_prices: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            fetch_timeout: Duration::from_secs(30),
            batch_prices: true,
        }
    }
}

/// Outcome of one tick. `succeeded + failed` equals the number of
/// instruments in the registry.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub tick: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<(InstrumentId, FetchErrorKind)>,
    pub elapsed: Duration,
}

impl TickReport {
    pub fn failed_ids(&self) -> Vec<&InstrumentId> {
        self.failures.iter().map(|(id, _)| id).collect()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

enum Job<'a> {
    Prices(Vec<&'a Instrument>),
    Price(&'a Instrument),
    Quote {
        pair: &'a Instrument,
        base: &'a Instrument,
        quote: &'a Instrument,
    },
}

type Outcome = (InstrumentId, Result<Sample, FetchError>);

pub struct SampleCollector<S> {
    source: Arc<S>,
    gate: RateGate,
    cfg: CollectorConfig,
}

impl<S: QuoteSource> SampleCollector<S> {
    pub fn new(source: Arc<S>, gate: RateGate, cfg: CollectorConfig) -> Self {
        Self { source, gate, cfg }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.cfg
    }

    /// Runs one tick against every instrument in `registry`.
    ///
    /// Never fails as a whole: each instrument either gains exactly one
    /// sample or is listed in the report's failures with its buffer
    /// untouched.
    pub async fn run_tick(&self, registry: &InstrumentRegistry, state: &RunState) -> TickReport {
        let tick = state.counters().ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let span = tick_span(tick);

        let report = self
            .collect(tick, registry, state)
            .instrument(span.clone())
            .await;

        span.record("succeeded", report.succeeded);
        span.record("failed", report.failed);

        report
    }

    async fn collect(&self, tick: u64, registry: &InstrumentRegistry, state: &RunState) -> TickReport {
        let started = Instant::now();
        let mut failures = Vec::new();
        let jobs = self.plan(registry, &mut failures);

        let outcomes: Vec<Vec<Outcome>> = stream::iter(jobs)
            .map(|job| self.run_job(job))
            .buffer_unordered(self.cfg.max_in_flight.max(1))
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let counters = state.counters();
        let mut succeeded = 0;

        for (id, result) in outcomes.into_iter().flatten() {
            match result {
                Ok(sample) => {
                    state.record(sample);
                    counters.fetch_ok.fetch_add(1, Ordering::Relaxed);
                    succeeded += 1;
                }
                Err(e) => {
                    warn!(instrument = %id, kind = %e.kind(), error = %e, "fetch failed");
                    counters.fetch_failed.fetch_add(1, Ordering::Relaxed);
                    failures.push((id, e.kind()));
                }
            }
        }

        failures.sort_by(|a, b| a.0.cmp(&b.0));

        let report = TickReport {
            tick,
            succeeded,
            failed: failures.len(),
            failures,
            elapsed: started.elapsed(),
        };

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "tick complete"
        );

        report
    }

    /// Splits the registry into fetch jobs. Pairs whose legs cannot be
    /// resolved fail up front without touching the source.
    fn plan<'a>(
        &self,
        registry: &'a InstrumentRegistry,
        failures: &mut Vec<(InstrumentId, FetchErrorKind)>,
    ) -> Vec<Job<'a>> {
        let mut jobs = Vec::new();

        let tokens: Vec<&Instrument> = registry.tokens().collect();
        if self.cfg.batch_prices && self.source.batches_prices() {
            if !tokens.is_empty() {
                jobs.push(Job::Prices(tokens));
            }
        } else {
            jobs.extend(tokens.into_iter().map(Job::Price));
        }

        for pair in registry.pairs() {
            match registry.legs(pair) {
                Some((base, quote)) => jobs.push(Job::Quote { pair, base, quote }),
                None => {
                    let e = FetchError::UnknownInstrument(pair.id.clone());
                    warn!(instrument = %pair.id, kind = %e.kind(), "pair legs not registered");
                    failures.push((pair.id.clone(), e.kind()));
                }
            }
        }

        jobs
    }

    async fn run_job(&self, job: Job<'_>) -> Vec<Outcome> {
        self.gate.admit().await;
        let limit = self.cfg.fetch_timeout;

        match job {
            Job::Prices(tokens) => {
                match tokio::time::timeout(limit, self.source.fetch_prices(&tokens)).await {
                    Ok(mut results) => tokens
                        .iter()
                        .map(|t| {
                            let r = results.remove(&t.id).unwrap_or(Err(FetchError::MissingPrice));
                            (t.id.clone(), checked(&t.id, r))
                        })
                        .collect(),
                    Err(_) => tokens
                        .iter()
                        .map(|t| (t.id.clone(), Err(FetchError::Timeout)))
                        .collect(),
                }
            }
            Job::Price(token) => {
                let r = tokio::time::timeout(limit, self.source.fetch_price(token))
                    .await
                    .unwrap_or(Err(FetchError::Timeout));
                vec![(token.id.clone(), checked(&token.id, r))]
            }
            Job::Quote { pair, base, quote } => {
                let r = match one_unit(base) {
                    Ok(amount) => tokio::time::timeout(
                        limit,
                        self.source.fetch_quote(&pair.id, base, quote, amount),
                    )
                    .await
                    .unwrap_or(Err(FetchError::Timeout)),
                    Err(e) => Err(e),
                };
                vec![(pair.id.clone(), checked(&pair.id, r))]
            }
        }
    }
}

/// A sample must land in the buffer of the instrument it was requested for.
fn checked(id: &InstrumentId, r: Result<Sample, FetchError>) -> Result<Sample, FetchError> {
    match r {
        Ok(s) if &s.instrument != id => Err(FetchError::InvalidResponse(format!(
            "sample for {} returned for {id}",
            s.instrument
        ))),
        other => other,
    }
}

/// Raw amount of one whole base token.
fn one_unit(base: &Instrument) -> Result<u64, FetchError> {
    base.decimals()
        .and_then(|d| 10u64.checked_pow(d))
        .ok_or_else(|| FetchError::InvalidResponse(format!("no unit amount for {}", base.id)))
}
