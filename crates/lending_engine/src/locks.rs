//! Per-loan mutual exclusion.
//!
//! Every mutating operation on a loan runs while holding that loan's guard, so the
//! read-check-write funding sequence cannot interleave with another mutation of the
//! same loan. Guards for different loans are independent.

use lending_core::types::LoanId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// Lazily populated arena of async locks keyed by loan id.
///
/// Entries are never evicted; one empty mutex per loan ever touched. The engine only
/// locks ids it has just read from the ledger, which bounds the arena by the number
/// of stored loans.
#[derive(Debug, Default)]
pub struct LoanLocks {
    arena: Mutex<HashMap<LoanId, Arc<tokio::sync::Mutex<()>>>>,
}

impl LoanLocks {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `loan_id`.
    ///
    /// Acquisition is FIFO among waiters for the same loan. Dropping the pending
    /// future leaves the queue without side effects.
    pub async fn acquire(&self, loan_id: LoanId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut arena = self
                .arena
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            arena.entry(loan_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of loans that have an entry
    pub fn len(&self) -> usize {
        self.arena
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether no loan has been locked yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
