//! Shared admission gate in front of the quote source.
//!
//! A token bucket with burst 1 refilled once per `spacing`: however many
//! fetches run concurrently, the upstream sees at most one request per
//! spacing interval.

use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};

pub struct RateGate {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    spacing: Duration,
}

impl RateGate {
    /// A zero spacing disables the gate.
    pub fn new(spacing: Duration) -> Self {
        Self {
            limiter: Quota::with_period(spacing).map(RateLimiter::direct),
            spacing,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Waits until one request may be issued.
    pub async fn admit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }
}
