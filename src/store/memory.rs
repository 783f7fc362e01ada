//! In-process draft store.
//!
//! Backs sync manager tests and embedded single-process setups. Behaves like
//! the real store: last write wins, the version counter is the single arbiter
//! of "newer", and availability can be toggled to simulate outages.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Mutex;

use super::{DraftMeta, DraftRecord, DraftStore, StoreError};
use crate::document::Draft;

/// Draft store held entirely in memory.
///
/// Share one instance between sessions with an `Arc` to exercise multi-editor
/// flows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<DraftRecord>>,
    unavailable: AtomicBool,
    unconfigured: AtomicBool,
    get_calls: AtomicU64,
    read_gate: Mutex<()>,
}

impl MemoryStore {
    /// Creates an empty, reachable store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that answers every call with `NotConfigured`.
    pub fn unconfigured() -> Self {
        let store = Self::default();
        store.unconfigured.store(true, Ordering::Release);
        store
    }

    /// Simulates the store going down (`true`) or coming back (`false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// Number of full `get` reads served. Meta reads are not counted.
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::Acquire)
    }

    /// Stalls full reads while the returned guard is held.
    ///
    /// Tests use this to keep a fetch in flight while they act on the
    /// caller in the meantime.
    pub async fn block_reads(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.read_gate.lock().await
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unconfigured.load(Ordering::Acquire) {
            return Err(StoreError::NotConfigured);
        }
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::Network("store unreachable".to_string()));
        }
        Ok(())
    }
}

impl DraftStore for MemoryStore {
    async fn get(&self) -> Result<DraftRecord, StoreError> {
        self.check_reachable()?;
        self.get_calls.fetch_add(1, Ordering::AcqRel);
        let _gate = self.read_gate.lock().await;

        let record = self.record.lock().await;
        record.clone().ok_or(StoreError::NotFound)
    }

    async fn get_meta(&self) -> Result<DraftMeta, StoreError> {
        self.check_reachable()?;

        let record = self.record.lock().await;
        record
            .as_ref()
            .map(|r| DraftMeta {
                version: r.version,
                user_id: r.user_id.clone(),
            })
            .ok_or(StoreError::NotFound)
    }

    async fn put(&self, draft: &Draft, editor_id: &str) -> Result<u64, StoreError> {
        self.check_reachable()?;

        let mut record = self.record.lock().await;
        let version = record.as_ref().map(|r| r.version + 1).unwrap_or(1);
        *record = Some(DraftRecord {
            state: draft.clone(),
            version,
            user_id: editor_id.to_string(),
        });
        Ok(version)
    }
}
