use std::collections::BTreeMap;

use corelib::format::{fixed, humanize_price};
use corelib::{InstrumentId, InstrumentRegistry, Sample};
use serde::Serialize;

use crate::time::format_ts;

pub const SHEET: &str = "summary";

/// Latest sample of one instrument.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub sheet: &'static str,
    pub instrument: String,
    pub symbol: String,
    pub kind: &'static str,
    pub category: &'static str,
    pub timestamp: String,
    pub price_human: String,
    pub price: String,
    pub confidence: Option<f64>,
    pub change_24h_pct: Option<f64>,
    pub provider: Option<String>,
    pub samples: usize,
}

/// One row per instrument holding data, sorted by instrument id.
pub fn rows(
    snapshot: &BTreeMap<InstrumentId, Vec<Sample>>,
    registry: &InstrumentRegistry,
) -> Vec<SummaryRow> {
    snapshot
        .iter()
        .filter_map(|(id, samples)| {
            let last = samples.last()?;
            Some(row(id, last, samples.len(), registry))
        })
        .collect()
}

fn row(id: &InstrumentId, last: &Sample, samples: usize, registry: &InstrumentRegistry) -> SummaryRow {
    let inst = registry.get(id);

    let price_human = match inst.and_then(|p| registry.legs(p)) {
        Some((_, quote)) if last.is_quote() => format!("{} {}", fixed(last.price, 6), quote.symbol),
        _ => humanize_price(last.price),
    };

    SummaryRow {
        sheet: SHEET,
        instrument: id.to_string(),
        symbol: inst.map_or_else(|| id.to_string(), |i| i.symbol.clone()),
        kind: match inst {
            Some(i) => i.kind_label(),
            None if last.is_quote() => "pair",
            None => "token",
        },
        category: inst.map_or("", |i| i.category.as_str()),
        timestamp: format_ts(&last.ts),
        price_human,
        price: last.price.to_string(),
        confidence: last.meta.confidence,
        change_24h_pct: last.meta.change_24h_pct,
        provider: last.meta.provider.clone(),
        samples,
    }
}
