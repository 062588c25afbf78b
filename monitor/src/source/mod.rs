//! Upstream price / quote capability.

pub mod jupiter;

use std::collections::HashMap;

use async_trait::async_trait;
use corelib::{Instrument, InstrumentId, Sample};

use crate::error::FetchError;

pub use jupiter::JupiterClient;

/// One production implementation ([`JupiterClient`]); tests supply their own.
///
/// Implementations perform exactly one upstream request per call and do
/// not retry; rate limiting and timeouts are applied by the caller.
#[async_trait]
pub trait QuoteSource: Send + Sync + 'static {
    /// USD price of a single token.
    async fn fetch_price(&self, token: &Instrument) -> Result<Sample, FetchError>;

    /// Swap quote for `amount` raw units of `input` into `output`, recorded
    /// under `pair`.
    async fn fetch_quote(
        &self,
        pair: &InstrumentId,
        input: &Instrument,
        output: &Instrument,
        amount: u64,
    ) -> Result<Sample, FetchError>;

    /// Whether [`QuoteSource::fetch_prices`] answers a whole batch with a
    /// single upstream request. The collector only plans batched jobs for
    /// sources that return `true`, since a batch passes the rate gate once.
    fn batches_prices(&self) -> bool {
        false
    }

    /// Prices for several tokens. Callers must tolerate partial success and
    /// treat ids absent from the result as missing.
    ///
    /// The default issues one `fetch_price` per token and is not gated per
    /// request.
    async fn fetch_prices(
        &self,
        tokens: &[&Instrument],
    ) -> HashMap<InstrumentId, Result<Sample, FetchError>> {
        let mut out = HashMap::with_capacity(tokens.len());
        for t in tokens {
            out.insert(t.id.clone(), self.fetch_price(t).await);
        }
        out
    }
}
