use std::fmt;

/// Stable identifier of a monitored instrument.
///
/// Tokens are keyed by symbol (`SOL`), pairs by `BASE/QUOTE` (`SOL/USDC`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    pub fn pair(base: &InstrumentId, quote: &InstrumentId) -> Self {
        Self(format!("{}/{}", base.0, quote.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

/// Trading-volume tier used to group tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    High,
    Mid,
    Low,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::High => "high",
            Category::Mid => "mid",
            Category::Low => "low",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentKind {
    /// A single token, priced in USD.
    Token { mint: String, decimals: u32 },

    /// A swap route quoted from `base` into `quote`.
    Pair {
        base: InstrumentId,
        quote: InstrumentId,
    },
}

/// Immutable registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub id: InstrumentId,
    pub symbol: String,
    pub name: String,
    pub category: Category,
    pub kind: InstrumentKind,
}

impl Instrument {
    pub fn token(
        symbol: &str,
        mint: &str,
        decimals: u32,
        name: &str,
        category: Category,
    ) -> Self {
        Self {
            id: InstrumentId::new(symbol),
            symbol: symbol.to_string(),
            name: name.to_string(),
            category,
            kind: InstrumentKind::Token {
                mint: mint.to_string(),
                decimals,
            },
        }
    }

    /// Pair quoted from `base` into `quote`. Takes the base token's tier.
    pub fn pair(base: &Instrument, quote: &Instrument) -> Self {
        let id = InstrumentId::pair(&base.id, &quote.id);
        Self {
            symbol: id.to_string(),
            name: format!("{} / {}", base.name, quote.name),
            category: base.category,
            kind: InstrumentKind::Pair {
                base: base.id.clone(),
                quote: quote.id.clone(),
            },
            id,
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self.kind, InstrumentKind::Pair { .. })
    }

    pub fn mint(&self) -> Option<&str> {
        match &self.kind {
            InstrumentKind::Token { mint, .. } => Some(mint),
            InstrumentKind::Pair { .. } => None,
        }
    }

    pub fn decimals(&self) -> Option<u32> {
        match &self.kind {
            InstrumentKind::Token { decimals, .. } => Some(*decimals),
            InstrumentKind::Pair { .. } => None,
        }
    }

    pub fn legs(&self) -> Option<(&InstrumentId, &InstrumentId)> {
        match &self.kind {
            InstrumentKind::Pair { base, quote } => Some((base, quote)),
            InstrumentKind::Token { .. } => None,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        if self.is_pair() { "pair" } else { "token" }
    }
}
