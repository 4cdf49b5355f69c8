//! Concurrency control for batch lookups.
//!
//! A [`Governor`] combines a counting semaphore (how many lookups may be in
//! flight) with a spacing limiter (how close together two request starts may
//! be). Both are shared by every task of one batch.

use crate::error::LookupError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Minimum-spacing limiter: request starts are at least `interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// A limiter allowing `rate` request starts per second.
    pub fn per_second(rate: f64) -> Result<Self, LookupError> {
        Ok(Self {
            interval: crate::types::rate_limit_interval(rate)?,
            next_slot: Mutex::new(Instant::now()),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next free slot.
    ///
    /// The slot is reserved under the lock and slept for outside it, so
    /// waiters queue up one interval apart.
    pub async fn wait(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Held for the duration of one lookup; dropping it frees the slot.
#[derive(Debug)]
pub struct GovernorPermit {
    _permit: OwnedSemaphorePermit,
}

/// Shared admission control for a batch.
#[derive(Debug, Clone)]
pub struct Governor {
    semaphore: Arc<Semaphore>,
    limiter: Arc<RateLimiter>,
    max_concurrency: usize,
}

impl Governor {
    /// Create a governor allowing `max_concurrency` in-flight lookups and
    /// `rate_limit` rate-limited request starts per second.
    pub fn new(max_concurrency: usize, rate_limit: f64) -> Result<Self, LookupError> {
        if max_concurrency == 0 {
            return Err(LookupError::config("Concurrency must be at least 1"));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            limiter: Arc::new(RateLimiter::per_second(rate_limit)?),
            max_concurrency,
        })
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Free permits right now.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit, then (for WHOIS and RDAP traffic) for a rate slot.
    pub async fn acquire(&self, rate_limited: bool) -> Result<GovernorPermit, LookupError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LookupError::internal("Concurrency governor closed"))?;

        if rate_limited {
            self.limiter.wait().await;
        }

        Ok(GovernorPermit { _permit: permit })
    }
}
