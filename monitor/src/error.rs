use std::fmt;
use std::path::PathBuf;

use corelib::InstrumentId;
use thiserror::Error;

/// Per-instrument fetch failure. Transient by nature: recorded in the tick
/// report, never propagated past the collector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("upstream returned status {status}")]
    Upstream { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no price returned for instrument")]
    MissingPrice,

    #[error("unknown instrument {0}")]
    UnknownInstrument(InstrumentId),
}

/// Coarse classification of a [`FetchError`] carried in tick reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Timeout,
    RateLimited,
    Upstream,
    Transport,
    InvalidResponse,
    MissingPrice,
    UnknownInstrument,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Timeout => FetchErrorKind::Timeout,
            FetchError::RateLimited => FetchErrorKind::RateLimited,
            FetchError::Upstream { .. } => FetchErrorKind::Upstream,
            FetchError::Transport(_) => FetchErrorKind::Transport,
            FetchError::InvalidResponse(_) => FetchErrorKind::InvalidResponse,
            FetchError::MissingPrice => FetchErrorKind::MissingPrice,
            FetchError::UnknownInstrument(_) => FetchErrorKind::UnknownInstrument,
        }
    }
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::RateLimited => "rate_limited",
            FetchErrorKind::Upstream => "upstream",
            FetchErrorKind::Transport => "transport",
            FetchErrorKind::InvalidResponse => "invalid_response",
            FetchErrorKind::MissingPrice => "missing_price",
            FetchErrorKind::UnknownInstrument => "unknown_instrument",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return FetchError::Timeout;
        }
        if let Some(status) = e.status() {
            return if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                FetchError::RateLimited
            } else {
                FetchError::Upstream {
                    status: status.as_u16(),
                }
            };
        }
        if e.is_decode() {
            return FetchError::InvalidResponse(e.to_string());
        }
        FetchError::Transport(e.to_string())
    }
}

/// Failure to materialize one artifact. Other artifacts are still attempted.
#[derive(Error, Debug)]
pub enum ExportWriteError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failure to read an artifact back.
#[derive(Error, Debug)]
pub enum ArtifactReadError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("bad timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("bad price {value:?}: {source}")]
    Price {
        value: String,
        #[source]
        source: rust_decimal::Error,
    },
}

/// Startup configuration failure. Fatal.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure constructing the upstream HTTP client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("api key is not a valid header value")]
    InvalidApiKey,

    #[error("http client build failed: {0}")]
    Build(#[from] reqwest::Error),
}
