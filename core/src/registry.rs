//! Read-only instrument registry.
//!
//! Built once at startup and shared by reference; never mutated afterwards.

use std::collections::HashMap;

use thiserror::Error;

use crate::models::instrument::{Category, Instrument, InstrumentId, InstrumentKind};

/// Largest decimals a token may declare (bounded by `Decimal` scale).
pub const MAX_DECIMALS: u32 = 28;

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("duplicate instrument id {0}")]
    DuplicateId(InstrumentId),

    #[error("pair {pair} references unknown token {leg}")]
    UnknownLeg { pair: InstrumentId, leg: InstrumentId },

    #[error("token {id} declares {decimals} decimals (max {MAX_DECIMALS})")]
    DecimalsOutOfRange { id: InstrumentId, decimals: u32 },
}

#[derive(Debug, Clone)]
pub struct InstrumentRegistry {
    /// Declaration order.
    instruments: Vec<Instrument>,
    index: HashMap<InstrumentId, usize>,
}

impl InstrumentRegistry {
    /// Validates and indexes `instruments`. Pair legs must be tokens
    /// declared in the same set.
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(instruments.len());
        for (i, inst) in instruments.iter().enumerate() {
            if index.insert(inst.id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateId(inst.id.clone()));
            }
        }

        for inst in &instruments {
            match &inst.kind {
                InstrumentKind::Token { decimals, .. } if *decimals > MAX_DECIMALS => {
                    return Err(RegistryError::DecimalsOutOfRange {
                        id: inst.id.clone(),
                        decimals: *decimals,
                    });
                }
                InstrumentKind::Token { .. } => {}
                InstrumentKind::Pair { base, quote } => {
                    for leg in [base, quote] {
                        let is_token = index
                            .get(leg)
                            .is_some_and(|&i| !instruments[i].is_pair());
                        if !is_token {
                            return Err(RegistryError::UnknownLeg {
                                pair: inst.id.clone(),
                                leg: leg.clone(),
                            });
                        }
                    }
                }
            }
        }

        Ok(Self { instruments, index })
    }

    /// The monitored Solana universe: high and mid volume tokens plus the
    /// quoted pairs.
    pub fn solana_default() -> Result<Self, RegistryError> {
        use Category::{High, Mid};

        let tokens = vec![
            Instrument::token("SOL", "So11111111111111111111111111111111111111112", 9, "Solana", High),
            Instrument::token("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6, "USD Coin", High),
            Instrument::token("USDT", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", 6, "Tether USD", High),
            Instrument::token("JUP", "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", 6, "Jupiter", High),
            Instrument::token("RAY", "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R", 6, "Raydium", Mid),
            Instrument::token("BONK", "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", 5, "Bonk", Mid),
            Instrument::token("JTO", "jtojtomepa8beP8AuQc6eXt5FriJwfFMwQx2v2f9mCL", 9, "Jito", Mid),
            Instrument::token("PYTH", "HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3", 6, "Pyth Network", Mid),
            Instrument::token("WIF", "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm", 6, "dogwifhat", Mid),
            Instrument::token("POPCAT", "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr", 9, "Popcat", Mid),
            Instrument::token("MOUTAI", "45EgCwcPXYagBC7KqBin4nCFg8WNdhG6ewM7ktrWmWqT", 9, "Moutai", Mid),
            Instrument::token("MYRO", "MyroWeY4e6kHnTbw8a14Cjc5PZFWJzBQqnd8NCZKHpq", 9, "Myro", Mid),
            Instrument::token("WEN", "WENWENvqqNya429ubCdR81ZmD69brwQaaBYY6g3bsZg", 5, "WEN", Mid),
        ];

        let pairs = [
            ("SOL", "USDC"),
            ("JUP", "USDC"),
            ("RAY", "USDC"),
            ("BONK", "SOL"),
            ("JTO", "USDC"),
            ("PYTH", "USDC"),
            ("WIF", "SOL"),
        ];

        Self::with_pairs(tokens, &pairs)
    }

    /// Builds a registry from `tokens` plus pairs named by token symbol.
    pub fn with_pairs(
        tokens: Vec<Instrument>,
        pairs: &[(&str, &str)],
    ) -> Result<Self, RegistryError> {
        let mut all = tokens;
        for (base, quote) in pairs {
            let find = |sym: &str| all.iter().find(|t| t.id.as_str() == sym && !t.is_pair());
            let pair = match (find(base), find(quote)) {
                (Some(b), Some(q)) => Instrument::pair(b, q),
                (b, _) => {
                    let leg = if b.is_none() { *base } else { *quote };
                    return Err(RegistryError::UnknownLeg {
                        pair: InstrumentId::new(format!("{base}/{quote}")),
                        leg: InstrumentId::new(leg),
                    });
                }
            };
            all.push(pair);
        }

        Self::new(all)
    }

    pub fn get(&self, id: &InstrumentId) -> Option<&Instrument> {
        self.index.get(id).map(|&i| &self.instruments[i])
    }

    pub fn by_mint(&self, mint: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.mint() == Some(mint))
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Instrument> {
        self.instruments
            .iter()
            .filter(move |i| !i.is_pair() && i.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter().filter(|i| !i.is_pair())
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter().filter(|i| i.is_pair())
    }

    /// Resolves a pair's base and quote tokens.
    pub fn legs(&self, pair: &Instrument) -> Option<(&Instrument, &Instrument)> {
        let (base, quote) = pair.legs()?;
        Some((self.get(base)?, self.get(quote)?))
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(sym: &str) -> Instrument {
        Instrument::token(sym, &format!("{sym}-mint"), 6, sym, Category::Mid)
    }

    #[test]
    fn default_universe_has_thirteen_tokens_and_seven_pairs() {
        let reg = InstrumentRegistry::solana_default().unwrap();

        assert_eq!(reg.tokens().count(), 13);
        assert_eq!(reg.pairs().count(), 7);
        assert_eq!(reg.by_category(Category::High).count(), 4);
        assert_eq!(reg.by_category(Category::Mid).count(), 9);

        for pair in reg.pairs() {
            let (base, quote) = reg.legs(pair).expect("pair legs resolve");
            assert!(!base.is_pair());
            assert!(!quote.is_pair());
        }
    }

    #[test]
    fn lookups_by_id_and_mint() {
        let reg = InstrumentRegistry::solana_default().unwrap();

        let sol = reg.get(&"SOL".into()).unwrap();
        assert_eq!(sol.decimals(), Some(9));

        let by_mint = reg
            .by_mint("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263")
            .unwrap();
        assert_eq!(by_mint.symbol, "BONK");

        assert!(reg.get(&"DOGE".into()).is_none());
    }

    #[test]
    fn iteration_keeps_declaration_order() {
        let reg = InstrumentRegistry::with_pairs(vec![tok("B"), tok("A")], &[("A", "B")]).unwrap();
        let ids: Vec<&str> = reg.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "A/B"]);
    }

    #[test]
    fn dangling_pair_leg_is_rejected() {
        let err = InstrumentRegistry::with_pairs(vec![tok("A")], &[("A", "Z")]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownLeg {
                pair: "A/Z".into(),
                leg: "Z".into()
            }
        );

        // Built by hand, bypassing with_pairs.
        let a = tok("A");
        let z = tok("Z");
        let err = InstrumentRegistry::new(vec![a.clone(), Instrument::pair(&a, &z)]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownLeg { .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = InstrumentRegistry::new(vec![tok("A"), tok("A")]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId("A".into()));
    }

    #[test]
    fn excessive_decimals_are_rejected() {
        let weird = Instrument::token("X", "x", 40, "X", Category::Low);
        let err = InstrumentRegistry::new(vec![weird]).unwrap_err();
        assert!(matches!(err, RegistryError::DecimalsOutOfRange { decimals: 40, .. }));
    }
}
