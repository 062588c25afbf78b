use std::collections::HashMap;

use chrono::{DateTime, Utc};
use corelib::format::to_human_amount;
use corelib::{Instrument, InstrumentId, PriceMeta, QuoteFields, RouteHop, Sample};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;

/// `/price/v3` body: mint → entry. Unknown mints may come back as `null`.
pub type PriceResponse = HashMap<String, Option<PriceEntry>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub usd_price: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub confidence: Option<f64>,
    pub provider: Option<String>,
}

impl PriceEntry {
    pub fn into_sample(self, id: InstrumentId, ts: DateTime<Utc>) -> Result<Sample, FetchError> {
        let usd = self
            .usd_price
            .ok_or_else(|| FetchError::InvalidResponse("missing usdPrice".into()))?;

        let price = Decimal::try_from(usd)
            .map_err(|e| FetchError::InvalidResponse(format!("usdPrice {usd}: {e}")))?;

        let sample = Sample::spot(id, ts, price)
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        Ok(sample.with_meta(PriceMeta {
            confidence: self.confidence,
            change_24h_pct: self.price_change_24h,
            provider: self.provider,
        }))
    }
}

/// `/swap/v1/quote` body (fields we use).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub in_amount: String,
    pub out_amount: String,

    /// Sent as a string by the API; tolerate numbers too.
    pub price_impact_pct: Option<Value>,

    pub slippage_bps: Option<u16>,

    #[serde(default)]
    pub route_plan: Vec<RoutePlanStep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
    pub swap_info: SwapInfo,
    pub percent: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    pub label: Option<String>,
    pub amm_key: Option<String>,
}

impl QuoteResponse {
    /// Builds a quote sample whose price is the effective rate
    /// `out / in` in token units.
    pub fn into_sample(
        self,
        pair: InstrumentId,
        input: &Instrument,
        output: &Instrument,
        requested_slippage_bps: u16,
        ts: DateTime<Utc>,
    ) -> Result<Sample, FetchError> {
        let in_amount = parse_units("inAmount", &self.in_amount)?;
        let out_amount = parse_units("outAmount", &self.out_amount)?;

        let in_human = human(input, in_amount)?;
        let out_human = human(output, out_amount)?;

        let rate = out_human
            .checked_div(in_human)
            .ok_or_else(|| FetchError::InvalidResponse("zero inAmount".into()))?;

        let price_impact_pct = self
            .price_impact_pct
            .as_ref()
            .and_then(number_like)
            .unwrap_or(0.0);

        let route = self
            .route_plan
            .into_iter()
            .map(|step| RouteHop {
                label: step
                    .swap_info
                    .label
                    .or(step.swap_info.amm_key)
                    .unwrap_or_else(|| "unknown".to_string()),
                percent: step.percent,
            })
            .collect();

        let fields = QuoteFields {
            in_amount,
            out_amount,
            price_impact_pct,
            slippage_bps: self.slippage_bps.unwrap_or(requested_slippage_bps),
            route,
        };

        Sample::quoted(pair, ts, rate, fields).map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }
}

fn parse_units(field: &str, v: &str) -> Result<u64, FetchError> {
    v.parse()
        .map_err(|e| FetchError::InvalidResponse(format!("{field} {v:?}: {e}")))
}

fn human(token: &Instrument, raw: u64) -> Result<Decimal, FetchError> {
    let decimals = token
        .decimals()
        .ok_or_else(|| FetchError::UnknownInstrument(token.id.clone()))?;
    to_human_amount(raw, decimals)
        .ok_or_else(|| FetchError::InvalidResponse(format!("{} decimals out of range", token.id)))
}

fn number_like(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
