//! Capacity accounting.
//!
//! Every node and chunk allocation is charged here before it happens, and
//! every free is credited back exactly once.

use thiserror::Error;

/// A reservation that would have pushed usage past the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity exceeded: requested {requested} units, {available} available")]
pub struct CapacityExceeded {
    /// Units asked for.
    pub requested: u64,
    /// Units that were free at the time.
    pub available: u64,
}

/// Byte budget for the whole filesystem.
///
/// Lives inside the engine state, so it is only ever touched under the
/// engine lock; reservation and the allocation it guards are never observed
/// separately.
#[derive(Debug, Clone)]
pub struct CapacityAccountant {
    max_size: u64,
    curr_size: u64,
}

impl CapacityAccountant {
    /// Create an accountant with nothing committed.
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            curr_size: 0,
        }
    }

    /// Commit `n` units if they fit under the ceiling.
    ///
    /// Returns false and leaves the counters alone otherwise.
    pub fn try_reserve(&mut self, n: u64) -> bool {
        match self.curr_size.checked_add(n) {
            Some(next) if next <= self.max_size => {
                self.curr_size = next;
                true
            }
            _ => {
                tracing::warn!(
                    requested = n,
                    curr_size = self.curr_size,
                    max_size = self.max_size,
                    "capacity reservation refused"
                );
                false
            }
        }
    }

    /// [`try_reserve`](Self::try_reserve) as a `Result`, for use with `?`.
    pub fn reserve(&mut self, n: u64) -> Result<(), CapacityExceeded> {
        let available = self.available();
        if self.try_reserve(n) {
            Ok(())
        } else {
            Err(CapacityExceeded {
                requested: n,
                available,
            })
        }
    }

    /// Return `n` previously reserved units.
    pub fn release(&mut self, n: u64) {
        debug_assert!(
            n <= self.curr_size,
            "releasing {n} units with only {} committed",
            self.curr_size
        );
        self.curr_size = self.curr_size.saturating_sub(n);
    }

    /// Configured ceiling.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Units currently committed.
    pub fn curr_size(&self) -> u64 {
        self.curr_size
    }

    /// Units still available.
    pub fn available(&self) -> u64 {
        self.max_size - self.curr_size
    }
}
