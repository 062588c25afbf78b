use std::path::PathBuf;

use clap::Parser;

/// Command-line overrides. Anything not given here falls back to the
/// environment (see `AppConfig::from_env`).
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "price-monitor")]
#[command(version, about = "Samples Solana token prices and swap quotes into rolling history")]
pub struct Cli {
    /// Seconds between ticks
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Run length in minutes (0 runs until interrupted)
    #[arg(long, value_name = "MINUTES")]
    pub duration: Option<u64>,

    /// Directory for exported artifacts
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Emit JSON logs
    #[arg(long)]
    pub log_json: bool,
}
