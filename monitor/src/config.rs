use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cli::Cli;
use crate::error::ConfigError;

/// Shipped in `.env.example`; never a real key.
pub const PLACEHOLDER_API_KEY: &str = "your_jupiter_api_key_here";

pub const DEFAULT_BASE_URL: &str = "https://api.jup.ag";

/// Rolling window targeted by the default buffer capacity.
pub const RETENTION_WINDOW_SECS: u64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Upstream credential, sent as `x-api-key`.
    pub api_key: String,
    pub base_url: String,

    // =========================
    // Run shape
    // =========================
    pub interval: Duration,

    /// `None` runs until interrupted.
    pub duration: Option<Duration>,

    pub output_dir: PathBuf,

    /// Explicit buffer capacity. When unset the capacity follows the
    /// interval, see [`AppConfig::buffer_capacity`].
    pub buffer_capacity: Option<usize>,

    // =========================
    // Upstream pressure
    // =========================
    /// Minimum spacing between upstream requests, whatever the concurrency.
    pub request_delay: Duration,

    pub fetch_timeout: Duration,

    /// Max fetches in flight within one tick.
    pub max_in_flight: usize,

    pub quote_slippage_bps: u16,

    /// One batched price request per tick instead of one per token.
    pub batch_prices: bool,

    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = lookup("JUPITER_API_KEY").ok_or(ConfigError::Missing("JUPITER_API_KEY"))?;
        if api_key == PLACEHOLDER_API_KEY {
            return Err(ConfigError::Invalid {
                var: "JUPITER_API_KEY",
                value: api_key,
                reason: "placeholder value; set a real key".into(),
            });
        }

        let interval_secs: u64 = parse(&lookup, "MONITOR_INTERVAL_SECONDS", 30)?;
        let duration_mins: u64 = parse(&lookup, "MONITOR_DURATION_MINUTES", 60)?;

        let cfg = Self {
            api_key,
            base_url: lookup("JUPITER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            interval: Duration::from_secs(interval_secs),
            duration: minutes(duration_mins),
            output_dir: lookup("MONITOR_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("price_history")),
            buffer_capacity: lookup("MONITOR_BUFFER_CAPACITY")
                .map(|v| parse_value("MONITOR_BUFFER_CAPACITY", v))
                .transpose()?,
            request_delay: Duration::from_millis(parse(&lookup, "MONITOR_REQUEST_DELAY_MS", 300)?),
            fetch_timeout: Duration::from_secs(parse(&lookup, "MONITOR_FETCH_TIMEOUT_SECS", 30)?),
            max_in_flight: parse(&lookup, "MONITOR_MAX_IN_FLIGHT", 4)?,
            quote_slippage_bps: parse(&lookup, "MONITOR_QUOTE_SLIPPAGE_BPS", 50)?,
            batch_prices: match lookup("MONITOR_BATCH_PRICES") {
                Some(v) => parse_bool("MONITOR_BATCH_PRICES", v)?,
                None => true,
            },
            log_json: lookup("APP_ENV").is_some_and(|v| v == "production"),
        };

        cfg.validate()
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_cli(mut self, cli: &Cli) -> Result<Self, ConfigError> {
        if let Some(secs) = cli.interval {
            self.interval = Duration::from_secs(secs);
        }
        if let Some(mins) = cli.duration {
            self.duration = minutes(mins);
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        self.log_json |= cli.log_json;

        self.validate()
    }

    /// Explicit capacity, or enough samples to cover the retention window
    /// at the configured interval (2880 at 30 s).
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity.unwrap_or_else(|| {
            let secs = self.interval.as_secs().max(1);
            usize::try_from(RETENTION_WINDOW_SECS / secs).unwrap_or(usize::MAX).max(1)
        })
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.interval < Duration::from_secs(1) {
            return Err(invalid("MONITOR_INTERVAL_SECONDS", self.interval.as_secs(), "must be at least 1"));
        }
        if self.buffer_capacity == Some(0) {
            return Err(invalid("MONITOR_BUFFER_CAPACITY", 0, "must be at least 1"));
        }
        if self.max_in_flight == 0 {
            return Err(invalid("MONITOR_MAX_IN_FLIGHT", 0, "must be at least 1"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(invalid("MONITOR_FETCH_TIMEOUT_SECS", 0, "must be at least 1"));
        }
        if self.quote_slippage_bps > 10_000 {
            return Err(invalid(
                "MONITOR_QUOTE_SLIPPAGE_BPS",
                self.quote_slippage_bps,
                "must not exceed 10000",
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "JUPITER_BASE_URL",
                value: self.base_url,
                reason: "must be an http(s) URL".into(),
            });
        }
        Ok(self)
    }
}

fn minutes(m: u64) -> Option<Duration> {
    (m > 0).then(|| Duration::from_secs(m.saturating_mul(60)))
}

fn parse<T, L>(lookup: &L, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(v) => parse_value(var, v),
        None => Ok(default),
    }
}

fn parse_value<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.parse() {
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::Invalid {
            reason: e.to_string(),
            var,
            value,
        }),
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected true or false".into(),
        }),
    }
}

fn invalid(var: &'static str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
