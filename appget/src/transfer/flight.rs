//! Per-key serialization of transfers.
//!
//! Two requests for the same digest resolve to the same cache folder. Only one
//! of them may download at a time; the other waits for the lock and then finds
//! the finished artifact through the normal cache check.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async lock table keyed by cache folder.
#[derive(Debug, Default)]
pub struct FlightLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

/// Held while a transfer owns its cache folder.
///
/// Dropping the guard releases the folder and prunes the table entry once no
/// other caller is waiting on it.
pub struct FlightGuard<'a> {
    // Field order matters: the mutex guard must drop before the slot.
    _guard: OwnedMutexGuard<()>,
    _slot: Slot<'a>,
}

/// A caller's claim on a table entry, from the start of `acquire` until its
/// guard is dropped.
///
/// Dropping a slot prunes the entry when nobody else references it, whether
/// the caller got the lock or gave up waiting.
struct Slot<'a> {
    table: &'a FlightLocks,
    key: PathBuf,
    lock: Option<Arc<Mutex<()>>>,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        self.table
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl FlightLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other transfer holds `key`, then claim it.
    ///
    /// Cancel-safe: dropping the returned future while it waits leaves no
    /// entry behind.
    pub async fn acquire(&self, key: &Path) -> FlightGuard<'_> {
        let lock = Arc::clone(self.locks.entry(key.to_path_buf()).or_default().value());
        let slot = Slot {
            table: self,
            key: key.to_path_buf(),
            lock: Some(Arc::clone(&lock)),
        };
        let guard = lock.lock_owned().await;

        FlightGuard {
            _guard: guard,
            _slot: slot,
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
