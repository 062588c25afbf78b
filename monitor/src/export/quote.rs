use std::collections::BTreeMap;

use corelib::format::{fixed, to_human_amount};
use corelib::{InstrumentId, InstrumentRegistry, Sample};
use serde::Serialize;

use crate::export::sheet_order;
use crate::time::format_ts;

/// One quote observation; `sheet` is the pair id. Amounts are in token
/// units of the pair's legs.
#[derive(Debug, Serialize)]
pub struct QuoteRow {
    pub sheet: String,
    pub timestamp: String,
    pub in_amount: String,
    pub out_amount: String,
    pub effective_price: String,
    pub price_impact_pct: f64,
    pub slippage_bps: u16,
    pub route: String,
}

pub fn rows(
    snapshot: &BTreeMap<InstrumentId, Vec<Sample>>,
    registry: &InstrumentRegistry,
) -> Vec<QuoteRow> {
    let mut out = Vec::new();

    for id in sheet_order(snapshot, registry) {
        let decimals = leg_decimals(registry, id);

        for s in &snapshot[id] {
            let Some(q) = &s.quote else { continue };
            out.push(QuoteRow {
                sheet: id.to_string(),
                timestamp: format_ts(&s.ts),
                in_amount: amount(q.in_amount, decimals.map(|d| d.0)),
                out_amount: amount(q.out_amount, decimals.map(|d| d.1)),
                effective_price: fixed(s.price, 6),
                price_impact_pct: q.price_impact_pct,
                slippage_bps: q.slippage_bps,
                route: q.route_description(),
            });
        }
    }

    out
}

fn leg_decimals(registry: &InstrumentRegistry, id: &InstrumentId) -> Option<(u32, u32)> {
    let pair = registry.get(id)?;
    let (base, quote) = registry.legs(pair)?;
    Some((base.decimals()?, quote.decimals()?))
}

/// Human units when the leg is known, raw units otherwise.
fn amount(raw: u64, decimals: Option<u32>) -> String {
    decimals
        .and_then(|d| to_human_amount(raw, d))
        .map(|v| v.normalize().to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_use_leg_decimals_when_known() {
        assert_eq!(amount(1_500_000_000, Some(9)), "1.5");
        assert_eq!(amount(1_500_000_000, None), "1500000000");
    }
}
