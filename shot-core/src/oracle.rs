//! Ordering oracle abstraction.
//!
//! The engine never owns time or randomness. Both come from an external,
//! strictly increasing sequence ("height") with unpredictable entropy per
//! height, injected through [`OrderingOracle`].

use crate::error::{Result, ShotError};
use crate::types::{Hash32, Height};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait OrderingOracle {
    fn current_height(&self) -> Height;

    /// Entropy bound to `height`. `None` until the height has been reached.
    fn entropy_for(&self, height: Height) -> Option<Hash32>;
}

impl<O: OrderingOracle + ?Sized> OrderingOracle for Arc<O> {
    fn current_height(&self) -> Height {
        (**self).current_height()
    }

    fn entropy_for(&self, height: Height) -> Option<Hash32> {
        (**self).entropy_for(height)
    }
}

/// Deterministic oracle driven by hand. Clones share the same height.
#[derive(Debug, Clone)]
pub struct ManualOracle {
    height: Arc<AtomicU64>,
    seed: Hash32,
}

impl ManualOracle {
    pub fn new(start_height: Height, seed: Hash32) -> Self {
        Self {
            height: Arc::new(AtomicU64::new(start_height)),
            seed,
        }
    }

    pub fn with_random_seed(start_height: Height) -> Self {
        let mut seed = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut seed);
        Self::new(start_height, seed)
    }

    pub fn seed(&self) -> Hash32 {
        self.seed
    }

    /// Moves forward by `by` heights, stopping at `Height::MAX`.
    pub fn advance(&self, by: u64) -> Height {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| Some(h.saturating_add(by)))
            .unwrap_or_else(|h| h);
        previous.saturating_add(by)
    }

    /// Like [`advance`](Self::advance), but fails instead of saturating.
    pub fn try_advance(&self, by: u64) -> Result<Height> {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| h.checked_add(by))
            .map_err(|_| ShotError::Overflow("oracle height"))?;
        Ok(previous + by)
    }

    /// Moves to `height`. Heights never go backwards.
    pub fn set_height(&self, height: Height) -> Height {
        self.height.fetch_max(height, Ordering::SeqCst).max(height)
    }
}

impl OrderingOracle for ManualOracle {
    fn current_height(&self) -> Height {
        self.height.load(Ordering::SeqCst)
    }

    fn entropy_for(&self, height: Height) -> Option<Hash32> {
        if height > self.current_height() {
            return None;
        }

        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(height.to_be_bytes());
        Some(hasher.finalize().into())
    }
}
