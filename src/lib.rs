//! Draftsync: collaborative newsletter-draft synchronization.
//!
//! Several editors work on one shared draft from independent sessions, with
//! no realtime transport - only periodic polling against a shared store.
//! This crate keeps their edits from clobbering each other without a lock
//! server:
//!
//! - [`document`]: the draft record and its fixed field-group partition
//! - [`merge`]: pure three-way merge at field-group granularity
//! - [`store`]: the versioned shared store (HTTP client and in-process)
//! - [`sync`]: the client control loop - debounced saves, polling, merge
//!   adoption, and the synced/saving/syncing/offline/local-only status
//!   machine
//! - [`cache`]: file-backed fallback so an outage never loses local edits
//! - [`identity`]: the persistent editor id that tags writes and keeps a
//!   session's own saves from triggering merges
//! - [`server`]: the store server (also built as `draftsync-server`)
//!
//! The consistency model is deliberately modest: eventually convergent,
//! last editor wins per field group. Two editors touching the same group
//! between syncs means one of them silently loses that group.

pub mod cache;
pub mod config;
pub mod document;
pub mod identity;
pub mod merge;
pub mod server;
pub mod store;
pub mod sync;

pub use cache::DraftCache;
pub use config::Config;
pub use document::{Draft, FieldGroup, FIELD_GROUPS};
pub use identity::EditorIdentity;
pub use merge::merge;
pub use store::{DraftMeta, DraftRecord, DraftStore, HttpDraftStore, MemoryStore, StoreError};
pub use sync::{SyncHandle, SyncManager, SyncStatus};
