#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use corelib::{Category, Instrument, InstrumentId, InstrumentRegistry, QuoteFields, RouteHop, Sample};
use monitor::error::FetchError;
use monitor::source::QuoteSource;
use monitor::state::RunState;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

/// Scripted quote source: every instrument succeeds at its configured
/// price unless told to fail, stall or go missing.
#[derive(Default)]
pub struct MockSource {
    prices: HashMap<InstrumentId, Decimal>,
    failures: HashMap<InstrumentId, FetchError>,
    missing: HashSet<InstrumentId>,
    delays: HashMap<InstrumentId, Duration>,
    delay_all: Option<Duration>,

    pub price_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub quote_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priced(mut self, id: &str, price: Decimal) -> Self {
        self.prices.insert(id.into(), price);
        self
    }

    pub fn failing(mut self, id: &str, err: FetchError) -> Self {
        self.failures.insert(id.into(), err);
        self
    }

    /// Left out of batch responses.
    pub fn missing(mut self, id: &str) -> Self {
        self.missing.insert(id.into());
        self
    }

    pub fn slow(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    pub fn slow_all(mut self, delay: Duration) -> Self {
        self.delay_all = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
            + self.batch_calls.load(Ordering::SeqCst)
            + self.quote_calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, id: &InstrumentId) -> Result<Decimal, FetchError> {
        if let Some(d) = self.delays.get(id).copied().or(self.delay_all) {
            tokio::time::sleep(d).await;
        }
        if let Some(e) = self.failures.get(id) {
            return Err(e.clone());
        }
        Ok(self.prices.get(id).copied().unwrap_or(Decimal::ONE))
    }
}

#[async_trait]
impl QuoteSource for MockSource {
    async fn fetch_price(&self, token: &Instrument) -> Result<Sample, FetchError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let price = self.answer(&token.id).await?;
        Ok(Sample::spot(token.id.clone(), Utc::now(), price).unwrap())
    }

    async fn fetch_quote(
        &self,
        pair: &InstrumentId,
        _input: &Instrument,
        _output: &Instrument,
        amount: u64,
    ) -> Result<Sample, FetchError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        let rate = self.answer(pair).await?;
        let quote = QuoteFields {
            in_amount: amount,
            out_amount: amount,
            price_impact_pct: 0.01,
            slippage_bps: 50,
            route: vec![RouteHop {
                label: "Whirlpool".into(),
                percent: Some(100),
            }],
        };
        Ok(Sample::quoted(pair.clone(), Utc::now(), rate, quote).unwrap())
    }

    fn batches_prices(&self) -> bool {
        true
    }

    async fn fetch_prices(
        &self,
        tokens: &[&Instrument],
    ) -> HashMap<InstrumentId, Result<Sample, FetchError>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = HashMap::new();
        for t in tokens {
            if self.missing.contains(&t.id) {
                continue;
            }
            let r = self
                .answer(&t.id)
                .await
                .map(|p| Sample::spot(t.id.clone(), Utc::now(), p).unwrap());
            out.insert(t.id.clone(), r);
        }
        out
    }
}

pub fn token(sym: &str, decimals: u32) -> Instrument {
    Instrument::token(sym, &format!("{sym}-mint"), decimals, sym, Category::High)
}

/// SOL, USDC, JUP and the SOL/USDC pair.
pub fn registry() -> Arc<InstrumentRegistry> {
    Arc::new(
        InstrumentRegistry::with_pairs(
            vec![token("SOL", 9), token("USDC", 6), token("JUP", 6)],
            &[("SOL", "USDC")],
        )
        .unwrap(),
    )
}

/// Tokens only.
pub fn token_registry(symbols: &[&str]) -> Arc<InstrumentRegistry> {
    Arc::new(InstrumentRegistry::new(symbols.iter().map(|s| token(s, 6)).collect()).unwrap())
}

pub fn run_state(interval: Duration, duration: Option<Duration>) -> Arc<RunState> {
    Arc::new(RunState::new(100, interval, duration, CancellationToken::new()))
}
