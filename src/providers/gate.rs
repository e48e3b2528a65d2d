//! Process-wide admission control for outbound provider calls.
//!
//! Upstream providers rate-limit aggressively, so the gateway bounds how
//! many sends are in flight at once — across every caller and adapter —
//! with a counting semaphore. The gate is a pure capacity bound: wake
//! order is whatever tokio provides, and no fairness is guaranteed.
//!
//! Adapters hold a slot only for the duration of a single send. Backoff
//! sleeps happen with the slot released, so a sleeping retrier doesn't
//! starve other callers of capacity.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::{GatewayError, Result};

/// Default maximum concurrent provider sends.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Bounded counting semaphore over outbound sends.
///
/// One instance is shared by every adapter in a gateway; the in-flight
/// count never exceeds the configured limit.
#[derive(Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `limit` concurrent sends.
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
            limit: limit.max(1),
        }
    }

    /// Configured maximum concurrent sends.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free (for tests and reporting).
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Block until a slot is free or the call's deadline fires.
    ///
    /// On timeout, returns [`GatewayError::DeadlineExceeded`] without a
    /// request ever having been sent. The returned permit releases its
    /// slot on drop, on every exit path.
    pub async fn acquire(&self, deadline: Instant) -> Result<SlotPermit> {
        let acquire = self.semaphore.clone().acquire_owned();
        match tokio::time::timeout_at(deadline, acquire).await {
            Ok(Ok(permit)) => Ok(SlotPermit { _permit: permit }),
            // The semaphore is never closed while a gateway holds it.
            Ok(Err(_)) => Err(GatewayError::Configuration(
                "concurrency gate closed".to_string(),
            )),
            Err(_) => Err(GatewayError::DeadlineExceeded),
        }
    }
}

/// RAII token for one admitted send. Dropping it frees the slot.
#[derive(Debug)]
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
}
