//! Per-instrument rolling history.
//!
//! A bounded FIFO of samples, oldest first. Appends are O(1): once the
//! buffer holds `capacity` samples every append evicts the head before the
//! new sample goes in, so the length never exceeds the bound.
//!
//! The lock is held only for the append or the snapshot copy, never across
//! I/O. A snapshot taken concurrently with appends is an ordered copy of
//! the buffer at one instant.

use std::collections::VecDeque;

use corelib::{InstrumentId, Sample};
use parking_lot::Mutex;
use tracing::debug;

/// Upper bound on eager preallocation; larger buffers grow on demand.
const PREALLOC_LIMIT: usize = 4_096;

pub struct RollingBuffer {
    instrument: InstrumentId,
    capacity: usize,
    samples: Mutex<VecDeque<Sample>>,
}

impl RollingBuffer {
    /// `capacity` is clamped to at least 1.
    pub fn new(instrument: InstrumentId, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            instrument,
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT))),
        }
    }

    /// Appends at the tail, evicting the head when full. Returns the evicted
    /// sample, if any.
    ///
    /// A sample stamped earlier than the current tail is re-stamped to the
    /// tail's timestamp so the buffer stays non-decreasing in time.
    pub fn append(&self, mut sample: Sample) -> Option<Sample> {
        debug_assert_eq!(sample.instrument, self.instrument);

        let mut q = self.samples.lock();

        if let Some(last) = q.back() {
            if sample.ts < last.ts {
                debug!(
                    instrument = %self.instrument,
                    sample_ts = %sample.ts,
                    tail_ts = %last.ts,
                    "sample older than tail; clamping timestamp"
                );
                sample.ts = last.ts;
            }
        }

        let evicted = if q.len() >= self.capacity {
            q.pop_front()
        } else {
            None
        };
        q.push_back(sample);
        evicted
    }

    /// Ordered copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }
}
