use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use corelib::format::humanize_price;
use corelib::{InstrumentId, InstrumentRegistry, Sample};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactReadError;
use crate::export::sheet_order;
use crate::time::{format_ts, parse_ts};

/// One price observation; `sheet` is the instrument id.
#[derive(Debug, Serialize)]
pub struct PriceRow {
    pub sheet: String,
    pub timestamp: String,
    pub price_human: String,
    pub price_usd: String,
    pub confidence: Option<f64>,
    pub change_24h_pct: Option<f64>,
    pub provider: Option<String>,
}

impl PriceRow {
    fn from_sample(s: &Sample) -> Self {
        Self {
            sheet: s.instrument.to_string(),
            timestamp: format_ts(&s.ts),
            price_human: humanize_price(s.price),
            price_usd: s.price.to_string(),
            confidence: s.meta.confidence,
            change_24h_pct: s.meta.change_24h_pct,
            provider: s.meta.provider.clone(),
        }
    }
}

/// Price sheets in registry order, each oldest-first. Quote samples are
/// left to the quote artifact.
pub fn rows(
    snapshot: &BTreeMap<InstrumentId, Vec<Sample>>,
    registry: &InstrumentRegistry,
) -> Vec<PriceRow> {
    sheet_order(snapshot, registry)
        .into_iter()
        .flat_map(|id| snapshot[id].iter())
        .filter(|s| !s.is_quote())
        .map(PriceRow::from_sample)
        .collect()
}

#[derive(Debug, Deserialize)]
struct PriceRecord {
    sheet: String,
    timestamp: String,
    price_usd: String,
}

/// Reads `instrument`'s sheet of a price-history artifact back as
/// `(timestamp, price)` rows in file order.
pub fn read_price_history(
    path: &Path,
    instrument: &InstrumentId,
) -> Result<Vec<(DateTime<Utc>, Decimal)>, ArtifactReadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut out = Vec::new();

    for record in reader.deserialize::<PriceRecord>() {
        let record = record?;
        if record.sheet != instrument.as_str() {
            continue;
        }

        let ts = parse_ts(&record.timestamp).map_err(|source| ArtifactReadError::Timestamp {
            value: record.timestamp.clone(),
            source,
        })?;
        let price =
            Decimal::from_str(&record.price_usd).map_err(|source| ArtifactReadError::Price {
                value: record.price_usd.clone(),
                source,
            })?;

        out.push((ts, price));
    }

    Ok(out)
}
