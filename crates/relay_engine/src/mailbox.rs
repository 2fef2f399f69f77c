use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use relay_logging::relay_debug;

use crate::{ResumeHandle, StoredResult};

/// Take-once, last-write-wins store of checkpoints keyed by resume handle.
///
/// Entries are only removed by being read or evicted; there is no expiry.
#[derive(Debug, Default)]
pub struct Mailbox {
    entries: Mutex<HashMap<ResumeHandle, StoredResult>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `result` under `handle`, returning any unread value it replaced.
    pub fn put(&self, handle: ResumeHandle, result: StoredResult) -> Option<StoredResult> {
        relay_debug!("Mailbox put kind={} handle={}", result.kind(), handle);
        self.lock().insert(handle, result)
    }

    /// Returns and removes the entry for `handle` in one critical section.
    pub fn take_and_clear(&self, handle: &ResumeHandle) -> Option<StoredResult> {
        self.lock().remove(handle)
    }

    /// Drops any unread entry so a poller cannot see a stale checkpoint.
    pub fn evict(&self, handle: &ResumeHandle) -> bool {
        let evicted = self.lock().remove(handle);
        if let Some(result) = &evicted {
            relay_debug!("Mailbox evicted kind={} handle={}", result.kind(), handle);
        }
        evicted.is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The map holds plain values, so a panic elsewhere cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<ResumeHandle, StoredResult>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
