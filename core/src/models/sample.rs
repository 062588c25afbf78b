use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::instrument::InstrumentId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidSample {
    #[error("negative price {price} for {instrument}")]
    NegativePrice {
        instrument: InstrumentId,
        price: Decimal,
    },
}

/// Optional provider metadata attached to a price observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceMeta {
    pub confidence: Option<f64>,
    pub change_24h_pct: Option<f64>,
    pub provider: Option<String>,
}

/// One step of a swap route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteHop {
    /// AMM / venue label (e.g. `Whirlpool`).
    pub label: String,
    /// Share of the flow routed through this step, if reported.
    pub percent: Option<u8>,
}

/// Quote-specific fields. Amounts are raw on-chain units.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteFields {
    pub in_amount: u64,
    pub out_amount: u64,
    pub price_impact_pct: f64,
    pub slippage_bps: u16,
    pub route: Vec<RouteHop>,
}

impl QuoteFields {
    /// `Direct` for a single hop, otherwise `N hops (A → B → ...)`.
    pub fn route_description(&self) -> String {
        match self.route.len() {
            0 => "Unknown".to_string(),
            1 => "Direct".to_string(),
            n => {
                let labels: Vec<&str> = self.route.iter().map(|h| h.label.as_str()).collect();
                format!("{n} hops ({})", labels.join(" → "))
            }
        }
    }
}

/// One observation of one instrument at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub instrument: InstrumentId,
    pub ts: DateTime<Utc>,

    /// USD price for tokens, effective rate (quote units per base unit) for pairs.
    pub price: Decimal,

    pub meta: PriceMeta,

    /// Present only when the sample came from a swap quote.
    pub quote: Option<QuoteFields>,
}

impl Sample {
    /// Plain price observation.
    pub fn spot(
        instrument: InstrumentId,
        ts: DateTime<Utc>,
        price: Decimal,
    ) -> Result<Self, InvalidSample> {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(InvalidSample::NegativePrice { instrument, price });
        }

        Ok(Self {
            instrument,
            ts,
            price,
            meta: PriceMeta::default(),
            quote: None,
        })
    }

    /// Observation derived from a swap quote.
    pub fn quoted(
        instrument: InstrumentId,
        ts: DateTime<Utc>,
        rate: Decimal,
        quote: QuoteFields,
    ) -> Result<Self, InvalidSample> {
        let mut s = Self::spot(instrument, ts, rate)?;
        s.quote = Some(quote);
        Ok(s)
    }

    pub fn with_meta(mut self, meta: PriceMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn is_quote(&self) -> bool {
        self.quote.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn hop(label: &str) -> RouteHop {
        RouteHop {
            label: label.to_string(),
            percent: Some(100),
        }
    }

    fn quote(route: Vec<RouteHop>) -> QuoteFields {
        QuoteFields {
            in_amount: 1_000_000_000,
            out_amount: 147_000_000,
            price_impact_pct: 0.01,
            slippage_bps: 50,
            route,
        }
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = Sample::spot("SOL".into(), Utc::now(), Decimal::new(-1, 0)).unwrap_err();
        assert!(matches!(err, InvalidSample::NegativePrice { .. }));
    }

    #[test]
    fn zero_price_is_accepted() {
        let s = Sample::spot("SOL".into(), Utc::now(), Decimal::ZERO).unwrap();
        assert!(!s.is_quote());
    }

    #[test]
    fn route_description_by_hop_count() {
        assert_eq!(quote(vec![hop("Whirlpool")]).route_description(), "Direct");
        assert_eq!(
            quote(vec![hop("Raydium"), hop("Meteora")]).route_description(),
            "2 hops (Raydium → Meteora)"
        );
        assert_eq!(quote(vec![]).route_description(), "Unknown");
    }

    #[test]
    fn quoted_sample_carries_quote_fields() {
        let s = Sample::quoted(
            "SOL/USDC".into(),
            Utc::now(),
            Decimal::new(147, 0),
            quote(vec![hop("Whirlpool")]),
        )
        .unwrap();

        assert!(s.is_quote());
        assert_eq!(s.quote.unwrap().slippage_bps, 50);
    }
}
