pub mod runner;
pub mod state;

pub use runner::{RunSummary, Scheduler};
pub use state::SchedulerState;
