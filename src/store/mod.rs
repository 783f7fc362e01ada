//! Draft store: the shared durable home of the draft.
//!
//! The store holds the latest draft blob, a monotonic version number, and the
//! identity of the editor who last wrote it. It is deliberately last-write-
//! wins: there is no compare-and-swap and concurrent writers never fail.
//! Conflict resolution happens entirely on the client, in the merge engine,
//! before each write.

pub mod http;
pub mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::document::Draft;

pub use http::HttpDraftStore;
pub use memory::MemoryStore;

/// A full read of the store: draft plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub state: Draft,
    pub version: u64,
    pub user_id: String,
}

/// Metadata-only read, used for cheap polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMeta {
    pub version: u64,
    pub user_id: String,
}

/// Errors from draft store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No draft has ever been written. Treated as "start empty", not fatal.
    NotFound,
    /// The backing store is not provisioned. Clients degrade to local-only.
    NotConfigured,
    /// Transient transport failure. Retried on the next timer tick.
    Network(String),
    /// The store answered with something we could not interpret.
    Protocol(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "No draft has been written yet"),
            StoreError::NotConfigured => write!(f, "Draft store is not configured"),
            StoreError::Network(e) => write!(f, "Network error: {}", e),
            StoreError::Protocol(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Keyed versioned storage for the shared draft.
///
/// `get_meta` must be cheaper than `get` (no payload transfer); the sync
/// manager polls it on every tick. `put` never fails because of a concurrent
/// writer - the store is the single arbiter of the next version and simply
/// hands it out.
pub trait DraftStore: Send + Sync + 'static {
    /// Reads the latest draft with its version and last editor.
    fn get(&self) -> impl Future<Output = Result<DraftRecord, StoreError>> + Send;

    /// Reads only the version and last editor.
    fn get_meta(&self) -> impl Future<Output = Result<DraftMeta, StoreError>> + Send;

    /// Persists the draft, tagging it with the editor identity.
    ///
    /// Returns the new version.
    fn put(
        &self,
        draft: &Draft,
        editor_id: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

impl<S: DraftStore> DraftStore for std::sync::Arc<S> {
    fn get(&self) -> impl Future<Output = Result<DraftRecord, StoreError>> + Send {
        self.as_ref().get()
    }

    fn get_meta(&self) -> impl Future<Output = Result<DraftMeta, StoreError>> + Send {
        self.as_ref().get_meta()
    }

    fn put(
        &self,
        draft: &Draft,
        editor_id: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        self.as_ref().put(draft, editor_id)
    }
}
