use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use corelib::{Instrument, InstrumentId, Sample};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use crate::error::{ClientError, FetchError};
use crate::source::QuoteSource;
use crate::source::jupiter::types::{PriceResponse, QuoteResponse};

#[derive(Clone)]
pub struct JupiterClient {
    http: Client,
    base_url: String,
    slippage_bps: u16,
}

impl JupiterClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        timeout: Duration,
        slippage_bps: u16,
    ) -> Result<Self, ClientError> {
        let mut key = HeaderValue::from_str(api_key).map_err(|_| ClientError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            slippage_bps,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self, mints), fields(count = mints.len()), level = "debug")]
    pub async fn fetch_price_map(&self, mints: &[&str]) -> Result<PriceResponse, FetchError> {
        let url = format!("{}/price/v3", self.base_url);
        let ids = mints.join(",");

        let resp = self
            .http
            .get(&url)
            .query(&[("ids", ids.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: PriceResponse = resp.json().await?;

        debug!(returned = body.len(), "jupiter prices fetched");

        Ok(body)
    }

    #[instrument(
        skip(self),
        fields(input = %input_mint, output = %output_mint),
        level = "debug"
    )]
    pub async fn fetch_quote_raw(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
    ) -> Result<QuoteResponse, FetchError> {
        let url = format!("{}/swap/v1/quote", self.base_url);
        let amount = amount.to_string();
        let slippage = self.slippage_bps.to_string();

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("inputMint", input_mint),
                ("outputMint", output_mint),
                ("amount", amount.as_str()),
                ("slippageBps", slippage.as_str()),
                ("swapMode", "ExactIn"),
                ("restrictIntermediateTokens", "true"),
                ("maxAccounts", "64"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: QuoteResponse = resp.json().await?;

        debug!(
            in_amount = %body.in_amount,
            out_amount = %body.out_amount,
            hops = body.route_plan.len(),
            "jupiter quote fetched"
        );

        Ok(body)
    }
}

fn mint_of(token: &Instrument) -> Result<&str, FetchError> {
    token
        .mint()
        .ok_or_else(|| FetchError::UnknownInstrument(token.id.clone()))
}

#[async_trait]
impl QuoteSource for JupiterClient {
    fn batches_prices(&self) -> bool {
        true
    }

    async fn fetch_price(&self, token: &Instrument) -> Result<Sample, FetchError> {
        let mint = mint_of(token)?;
        let mut body = self.fetch_price_map(&[mint]).await?;

        match body.remove(mint).flatten() {
            Some(entry) => entry.into_sample(token.id.clone(), Utc::now()),
            None => Err(FetchError::MissingPrice),
        }
    }

    async fn fetch_quote(
        &self,
        pair: &InstrumentId,
        input: &Instrument,
        output: &Instrument,
        amount: u64,
    ) -> Result<Sample, FetchError> {
        let resp = self
            .fetch_quote_raw(mint_of(input)?, mint_of(output)?, amount)
            .await?;

        resp.into_sample(pair.clone(), input, output, self.slippage_bps, Utc::now())
    }

    /// One request for the whole batch.
    async fn fetch_prices(
        &self,
        tokens: &[&Instrument],
    ) -> HashMap<InstrumentId, Result<Sample, FetchError>> {
        let mut out = HashMap::with_capacity(tokens.len());

        let mut mints = Vec::with_capacity(tokens.len());
        for t in tokens {
            match mint_of(t) {
                Ok(m) => mints.push(m),
                Err(e) => {
                    out.insert(t.id.clone(), Err(e));
                }
            }
        }
        if mints.is_empty() {
            return out;
        }

        match self.fetch_price_map(&mints).await {
            Ok(mut body) => {
                let ts = Utc::now();
                for t in tokens {
                    let Some(mint) = t.mint() else { continue };
                    let result = match body.remove(mint).flatten() {
                        Some(entry) => entry.into_sample(t.id.clone(), ts),
                        None => Err(FetchError::MissingPrice),
                    };
                    out.insert(t.id.clone(), result);
                }
            }
            Err(e) => {
                for t in tokens.iter().filter(|t| t.mint().is_some()) {
                    out.insert(t.id.clone(), Err(e.clone()));
                }
            }
        }

        out
    }
}
