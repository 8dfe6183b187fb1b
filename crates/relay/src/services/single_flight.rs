//! Per-record mutual exclusion for decision relays.
//!
//! [`InFlightRecords`] admits at most one relay per record id at a time.
//! [`DecidedRecords`] remembers records whose decision reached the CRM so a
//! late click on a stale copy of the message is refused.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::future::Cache;

use approval_relay_core::RecordId;

/// Record ids with a relay currently running.
#[derive(Debug, Clone, Default)]
pub struct InFlightRecords {
    records: Arc<Mutex<HashSet<RecordId>>>,
}

impl InFlightRecords {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `record_id`, or `None` if another relay holds it.
    ///
    /// The claim is released when the returned guard drops.
    #[must_use]
    pub fn try_acquire(&self, record_id: &RecordId) -> Option<InFlightGuard> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(record_id.clone()).then(|| InFlightGuard {
            records: Arc::clone(&self.records),
            record_id: record_id.clone(),
        })
    }

    /// Whether a relay for `record_id` is running.
    #[must_use]
    pub fn contains(&self, record_id: &RecordId) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(record_id)
    }
}

/// Claim on one record id; releases on drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    records: Arc<Mutex<HashSet<RecordId>>>,
    record_id: RecordId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.record_id);
    }
}

/// Record ids whose decision was accepted by the CRM recently.
#[derive(Clone)]
pub struct DecidedRecords {
    cache: Cache<RecordId, ()>,
}

impl std::fmt::Debug for DecidedRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecidedRecords")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl DecidedRecords {
    const MAX_ENTRIES: u64 = 10_000;

    /// Remember decisions for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(Self::MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Whether `record_id` was decided within the window.
    pub async fn contains(&self, record_id: &RecordId) -> bool {
        self.cache.get(record_id).await.is_some()
    }

    /// Mark `record_id` as decided.
    pub async fn insert(&self, record_id: RecordId) {
        self.cache.insert(record_id, ()).await;
    }
}
