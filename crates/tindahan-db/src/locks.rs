//! # Stock Row Locks
//!
//! Per-(branch, variant) exclusive locks for quantity mutations.
//!
//! ## Why an in-process lock manager?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Lock-then-Mutate Unit of Work                        │
//! │                                                                         │
//! │  SQLite has no SELECT ... FOR UPDATE. On a single node the same        │
//! │  guarantee comes from an in-process mutex keyed by (branch, variant):  │
//! │                                                                         │
//! │  acquire locks (canonical order) ──► begin tx ──► validate ──► mutate  │
//! │        │                                             │                  │
//! │        │                                             ▼                  │
//! │        │                                     append audit ──► commit    │
//! │        └──────────── guards dropped only after commit/abort ───────────┘
//! │                                                                         │
//! │  Two operations on the same (branch, variant) are strictly serialized; │
//! │  disjoint variant sets proceed fully in parallel.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Deadlock avoidance
//! Multi-row acquisitions always lock in ascending (branch, variant) order,
//! so two sales with overlapping but differently-ordered item lists cannot
//! deadlock on each other.
//!
//! ## Bounded wait
//! Each acquisition waits at most the configured timeout; on expiry the
//! caller gets `CoreError::Busy` and nothing has been written. Retrying the
//! whole operation from scratch is always correct - partial retry of a
//! subset of items never is, because stock validation depends on all rows
//! being locked together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use tindahan_core::{CoreError, CoreResult};

/// Default bound on how long a unit of work waits for one row lock.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

/// Key identifying one lockable inventory row.
type StockKey = (String, String); // (branch_id, variant_id)

// =============================================================================
// Lock Manager
// =============================================================================

/// Hands out exclusive per-(branch, variant) locks with a bounded wait.
///
/// One instance is shared (via `Arc`) by every engine touching inventory.
/// Two engines with separate managers would not serialize against each
/// other, so the manager is constructed once next to the `Database`.
#[derive(Debug)]
pub struct StockLockManager {
    /// Registry of lock slots, lazily created per key.
    ///
    /// The std mutex only guards map access (insert/lookup), never held
    /// across an await.
    slots: StdMutex<HashMap<StockKey, Arc<TokioMutex<()>>>>,

    /// Bounded wait per row lock.
    timeout: Duration,
}

impl StockLockManager {
    /// Creates a manager with the given per-lock wait bound.
    pub fn new(timeout: Duration) -> Self {
        StockLockManager {
            slots: StdMutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Creates a manager with [`DEFAULT_LOCK_WAIT`].
    pub fn with_default_timeout() -> Self {
        Self::new(DEFAULT_LOCK_WAIT)
    }

    /// Returns the lock slot for a key, creating it on first use.
    fn slot(&self, key: &StockKey) -> Arc<TokioMutex<()>> {
        let mut slots = self.slots.lock().expect("lock registry poisoned");
        slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }

    /// Acquires the lock for a single (branch, variant) row.
    pub async fn acquire_one(&self, branch_id: &str, variant_id: &str) -> CoreResult<StockGuards> {
        let ids = [variant_id.to_string()];
        self.acquire(branch_id, &ids).await
    }

    /// Acquires locks for several variants at one branch, in canonical
    /// (ascending variant id) order.
    ///
    /// Callers must not pass duplicate variant ids: the second acquisition
    /// of the same key would wait on the first and time out. The sale
    /// processor rejects duplicate lines before reaching here; this method
    /// dedups defensively.
    ///
    /// On timeout returns `CoreError::Busy` naming the contended variant;
    /// locks already taken are released on drop.
    pub async fn acquire(&self, branch_id: &str, variant_ids: &[String]) -> CoreResult<StockGuards> {
        let mut ids: Vec<&String> = variant_ids.iter().collect();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());

        for variant_id in ids {
            let key = (branch_id.to_string(), variant_id.clone());
            let slot = self.slot(&key);

            match tokio::time::timeout(self.timeout, slot.lock_owned()).await {
                Ok(guard) => {
                    debug!(branch_id, variant_id = %variant_id, "stock row locked");
                    guards.push(guard);
                }
                Err(_) => {
                    warn!(
                        branch_id,
                        variant_id = %variant_id,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "stock row lock wait timed out"
                    );
                    // guards acquired so far are dropped here, releasing them
                    return Err(CoreError::Busy {
                        variant_id: variant_id.clone(),
                    });
                }
            }
        }

        Ok(StockGuards { _guards: guards })
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Holds a set of acquired row locks for the duration of a unit of work.
///
/// A unit of work keeps this alive until its transaction commits or aborts -
/// never releases early and reacquires.
#[derive(Debug)]
#[must_use = "dropping the guards releases the row locks"]
pub struct StockGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
