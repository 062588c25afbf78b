//! Shared model for the price monitor: instruments, the registry that names
//! them, and the samples collected for them.

pub mod format;
pub mod models;
pub mod registry;

pub use models::instrument::{Category, Instrument, InstrumentId, InstrumentKind};
pub use models::sample::{InvalidSample, PriceMeta, QuoteFields, RouteHop, Sample};
pub use registry::{InstrumentRegistry, RegistryError};
