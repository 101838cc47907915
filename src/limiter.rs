//! Global intake gate.
//!
//! A fixed number of pipeline runs may execute at once. Acquisition never
//! waits: when every slot is taken the caller is told to come back later.
//! Slots are released when the [`RunSlot`] guard drops, which also happens
//! while a panic unwinds through the run.

use std::sync::{Arc, OnceLock};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, info};

static GLOBAL: OnceLock<IntakeLimiter> = OnceLock::new();

/// Errors from [`IntakeLimiter::try_acquire`].
#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    /// Every slot is in use.
    #[error("all {capacity} intake slots are busy")]
    Rejected {
        /// Configured slot count.
        capacity: usize,
    },
}

/// Non-queueing counting gate over concurrent runs.
#[derive(Debug, Clone)]
pub struct IntakeLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Proof of an acquired slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct RunSlot {
    _permit: OwnedSemaphorePermit,
}

impl IntakeLimiter {
    /// Limiter with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Limiter sized from the number of available cores.
    pub fn from_parallelism() -> Self {
        Self::new(Self::default_capacity())
    }

    /// Half the detected cores, minimum one.
    pub fn default_capacity() -> usize {
        let cores = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        (cores / 2).max(1)
    }

    /// The process-wide limiter, created on first use from detected cores.
    pub fn global() -> &'static IntakeLimiter {
        GLOBAL.get_or_init(|| {
            let limiter = Self::from_parallelism();
            info!(capacity = limiter.capacity, "intake limiter initialized");
            limiter
        })
    }

    /// Create the process-wide limiter with an explicit size.
    ///
    /// Only the first call has an effect; the size never changes afterwards.
    /// Returns the limiter actually installed.
    pub fn install_global(capacity: usize) -> &'static IntakeLimiter {
        GLOBAL.get_or_init(|| {
            let limiter = Self::new(capacity);
            info!(capacity = limiter.capacity, "intake limiter initialized");
            limiter
        })
    }

    /// Take a slot without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::Rejected`] when every slot is held.
    pub fn try_acquire(&self) -> Result<RunSlot, LimiterError> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(RunSlot { _permit: permit }),
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => {
                debug!(capacity = self.capacity, "intake slot rejected");
                Err(LimiterError::Rejected {
                    capacity: self.capacity,
                })
            }
        }
    }

    /// Configured slot count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
