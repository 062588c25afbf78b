use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use corelib::{InstrumentId, Sample};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::buffer::RollingBuffer;
use crate::metrics::counters::Counters;

/// Process-wide run state, passed explicitly to the collector, scheduler and
/// exporter.
///
/// Buffers are created lazily on an instrument's first successful sample
/// and live until the process exits. The map lock only guards buffer
/// lookup/creation; appends and snapshots take the buffer's own lock.
pub struct RunState {
    buffers: RwLock<HashMap<InstrumentId, Arc<RollingBuffer>>>,
    capacity: usize,
    interval: Duration,

    /// `None` runs until cancelled.
    duration: Option<Duration>,

    cancel: CancellationToken,
    counters: Counters,
}

impl RunState {
    pub fn new(
        capacity: usize,
        interval: Duration,
        duration: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            buffers: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            interval: interval.max(Duration::from_millis(1)),
            duration: duration.filter(|d| !d.is_zero()),
            cancel,
            counters: Counters::default(),
        }
    }

    /// Appends `sample` to its instrument's buffer, creating the buffer on
    /// first use.
    pub fn record(&self, sample: Sample) {
        let buffer = self.buffer_or_create(&sample.instrument);
        if buffer.append(sample).is_some() {
            debug!(instrument = %buffer.instrument(), "rolling window full; evicted oldest sample");
        }
        self.counters
            .samples_appended
            .fetch_add(1, Ordering::Relaxed);
    }

    fn buffer_or_create(&self, id: &InstrumentId) -> Arc<RollingBuffer> {
        if let Some(b) = self.buffers.read().get(id) {
            return Arc::clone(b);
        }

        let mut g = self.buffers.write();
        Arc::clone(g.entry(id.clone()).or_insert_with(|| {
            debug!(instrument = %id, capacity = self.capacity, "creating rolling buffer");
            Arc::new(RollingBuffer::new(id.clone(), self.capacity))
        }))
    }

    pub fn buffer(&self, id: &InstrumentId) -> Option<Arc<RollingBuffer>> {
        self.buffers.read().get(id).cloned()
    }

    /// Ordered snapshot of every buffer, keyed by instrument.
    pub fn snapshot_all(&self) -> BTreeMap<InstrumentId, Vec<Sample>> {
        let buffers: Vec<Arc<RollingBuffer>> = self.buffers.read().values().cloned().collect();
        buffers
            .into_iter()
            .map(|b| (b.instrument().clone(), b.snapshot()))
            .collect()
    }

    /// Instruments holding at least one sample, sorted.
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = self.buffers.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn total_samples(&self) -> usize {
        self.buffers.read().values().map(|b| b.len()).sum()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}
