pub mod buffer;
pub mod cli;
pub mod collector;
pub mod config;
pub mod export;
pub mod gate;
pub mod metrics;
pub mod scheduler;
pub mod source;
pub mod state;

pub mod error;
pub mod logger;
pub mod time;
