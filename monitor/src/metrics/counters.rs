use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide counters for operational visibility. Never consulted for control flow.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    pub ticks: Arc<AtomicU64>,

    pub fetch_ok: Arc<AtomicU64>,
    pub fetch_failed: Arc<AtomicU64>,
    pub samples_appended: Arc<AtomicU64>,

    pub exports: Arc<AtomicU64>,
    pub export_failures: Arc<AtomicU64>,
}

/// Point-in-time copy of [`Counters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub ticks: u64,
    pub fetch_ok: u64,
    pub fetch_failed: u64,
    pub samples_appended: u64,
    pub exports: u64,
    pub export_failures: u64,
}

impl Counters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            fetch_ok: self.fetch_ok.load(Ordering::Relaxed),
            fetch_failed: self.fetch_failed.load(Ordering::Relaxed),
            samples_appended: self.samples_appended.load(Ordering::Relaxed),
            exports: self.exports.load(Ordering::Relaxed),
            export_failures: self.export_failures.load(Ordering::Relaxed),
        }
    }
}
