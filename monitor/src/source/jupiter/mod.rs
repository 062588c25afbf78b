pub mod client;
pub mod types;

pub use client::JupiterClient;
pub use types::*;
