//! Client sync manager: the save/poll/merge control loop.
//!
//! Owns the session's [`SyncState`] and is the only mutator of it, via the
//! reducer. Local edits are shadow-written to the fallback cache immediately
//! and pushed to the store after a debounce window; a fixed-interval poll
//! watches the store for other editors' writes and runs the merge engine
//! when one appears. At most one store operation (save or merge) is in
//! flight at a time; the [`Flight`] slot serializes them.
//!
//! Every failure path degrades: an unconfigured store means local-only
//! editing, a network error means offline until a later timer tick gets
//! through. Nothing here is fatal to the host application.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::DraftCache;
use crate::config::Config;
use crate::document::Draft;
use crate::identity::{EditorIdentity, IdentityError};
use crate::merge::merge;
use crate::store::{DraftStore, HttpDraftStore, StoreError};

use super::state::{reduce, Action, Flight, SyncState, SyncStatus};

/// Sync manager for one editing session.
///
/// Construct with [`SyncManager::new`] (or [`SyncManager::from_config`] for
/// the HTTP store), call [`bootstrap`](Self::bootstrap) once, then either
/// drive [`save_now`](Self::save_now)/[`poll_once`](Self::poll_once) manually
/// or let [`start`](Self::start) run the timers.
pub struct SyncManager<S: DraftStore> {
    /// `None` when no store is configured; the session is then local-only.
    store: Option<S>,
    cache: DraftCache,
    /// Read once at construction and cached for the whole session.
    editor_id: String,
    state: Mutex<SyncState>,
    watch_tx: watch::Sender<SyncState>,
    /// Bumped on every edit; the debounce loop saves after a quiet period.
    edit_seq: AtomicU64,
    edit_notify: Notify,
    debounce: Duration,
    poll_interval: Duration,
}

impl<S: DraftStore> SyncManager<S> {
    /// Creates a manager over the given store and cache.
    pub fn new(
        store: Option<S>,
        cache: DraftCache,
        editor_id: impl Into<String>,
        debounce: Duration,
        poll_interval: Duration,
    ) -> Self {
        let (watch_tx, _) = watch::channel(SyncState::new());
        Self {
            store,
            cache,
            editor_id: editor_id.into(),
            state: Mutex::new(SyncState::new()),
            watch_tx,
            edit_seq: AtomicU64::new(0),
            edit_notify: Notify::new(),
            debounce,
            poll_interval,
        }
    }

    /// Returns this session's editor identity.
    pub fn editor_id(&self) -> &str {
        &self.editor_id
    }

    /// Returns the current sync status.
    pub async fn status(&self) -> SyncStatus {
        self.state.lock().await.status
    }

    /// Returns a copy of the current local draft.
    pub async fn document(&self) -> Draft {
        self.state.lock().await.draft.clone()
    }

    /// Subscribes to state changes.
    ///
    /// The receiver observes a full [`SyncState`] copy after every reducer
    /// step.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.watch_tx.subscribe()
    }

    /// Adopts initial state from the store, or falls back to the cache.
    ///
    /// On a reachable store the fetched draft becomes both local state and
    /// the merge base (an unwritten draft starts empty at version 0). On
    /// `NotConfigured` the session becomes local-only; on any other failure
    /// it starts offline. Both fallbacks load the cached draft if one exists.
    pub async fn bootstrap(&self) {
        let Some(store) = &self.store else {
            self.bootstrap_fallback(false).await;
            return;
        };

        match store.get().await {
            Ok(record) => {
                if let Err(e) = self.cache.save(&record.state) {
                    tracing::warn!("Failed to write draft cache: {}", e);
                }
                self.dispatch(Action::Bootstrapped {
                    draft: record.state,
                    version: record.version,
                })
                .await;
            }
            Err(StoreError::NotFound) => {
                // No draft yet: start empty, the first save creates it
                self.dispatch(Action::Bootstrapped {
                    draft: Draft::new(),
                    version: 0,
                })
                .await;
            }
            Err(StoreError::NotConfigured) => {
                self.bootstrap_fallback(false).await;
            }
            Err(e) => {
                tracing::warn!("Bootstrap read failed: {}", e);
                self.bootstrap_fallback(true).await;
            }
        }
    }

    async fn bootstrap_fallback(&self, configured: bool) {
        let cached = match self.cache.load() {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("Failed to load draft cache: {}", e);
                None
            }
        };
        self.dispatch(Action::BootstrapFallback { cached, configured })
            .await;
    }

    /// Applies a local edit to the draft.
    ///
    /// The edit is shadow-written to the fallback cache and a debounced save
    /// is scheduled. Edits are accepted at any time, including while a save
    /// or merge is in flight; a merge resolves against the draft as it stands
    /// when the remote fetch completes, so a keystroke during the fetch is
    /// part of the local side of the merge rather than lost.
    pub async fn edit(&self, mutate: impl FnOnce(&mut Draft)) {
        let draft = {
            let mut state = self.state.lock().await;
            let mut draft = state.draft.clone();
            mutate(&mut draft);
            reduce(&mut state, Action::Edited { draft: draft.clone() });
            self.publish(&state);
            draft
        };

        if let Err(e) = self.cache.save(&draft) {
            tracing::warn!("Failed to write draft cache: {}", e);
        }

        if self.store.is_some() {
            self.edit_seq.fetch_add(1, Ordering::AcqRel);
            self.edit_notify.notify_one();
        }
    }

    /// Writes the current draft to the store if it has unsaved edits.
    ///
    /// Non-queuing: if a save or merge is already in flight this returns
    /// immediately and the next debounce cycle picks up the newer state. On
    /// success the written draft becomes the new merge base.
    pub async fn save_now(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let draft = {
            let mut state = self.state.lock().await;
            if state.flight != Flight::Idle || !state.dirty {
                return;
            }
            reduce(&mut state, Action::SaveStarted);
            self.publish(&state);
            state.draft.clone()
        };

        // Cache first, so even a failed store write leaves the shadow current
        if let Err(e) = self.cache.save(&draft) {
            tracing::warn!("Failed to write draft cache: {}", e);
        }

        match store.put(&draft, &self.editor_id).await {
            Ok(version) => {
                tracing::debug!(version, "Draft saved");
                self.dispatch(Action::Saved { draft, version }).await;
            }
            Err(StoreError::NotConfigured) => {
                self.dispatch(Action::SaveFailed { configured: false }).await;
            }
            Err(e) => {
                tracing::debug!("Save failed: {}", e);
                self.dispatch(Action::SaveFailed { configured: true }).await;
            }
        }
    }

    /// Runs one poll round against the store.
    ///
    /// Checks metadata only; the full draft is fetched just when the store
    /// holds a newer version written by a different editor. A self-written
    /// version never triggers a merge, so a session's own save cannot come
    /// back around and overwrite it.
    pub async fn poll_once(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let (known_version, busy) = {
            let state = self.state.lock().await;
            (state.version, state.flight != Flight::Idle)
        };
        if busy {
            // A save is mid-flight; this round is skipped, the next tick retries
            return;
        }

        let meta = match store.get_meta().await {
            Ok(meta) => meta,
            Err(StoreError::NotFound) => {
                self.poll_round_ok().await;
                return;
            }
            Err(StoreError::NotConfigured) => {
                self.dispatch(Action::StoreAbsent).await;
                return;
            }
            Err(e) => {
                tracing::debug!("Poll failed: {}", e);
                self.dispatch(Action::WentOffline).await;
                return;
            }
        };

        if meta.version <= known_version || meta.user_id == self.editor_id {
            self.poll_round_ok().await;
            return;
        }

        // Another editor wrote a newer version: fetch it and merge
        {
            let mut state = self.state.lock().await;
            if state.flight != Flight::Idle {
                return;
            }
            reduce(&mut state, Action::MergeStarted);
            self.publish(&state);
        }

        match store.get().await {
            Ok(record) => {
                // Merge against the state as of fetch completion, under one
                // lock with the adoption: edits made while the read was in
                // flight are part of the local side, never dropped
                let (merged, dirty) = {
                    let mut state = self.state.lock().await;
                    let merged = merge(&state.draft, &record.state, &state.snapshot);
                    // Local group edits the merge preserved are still unsaved
                    let dirty = merged != record.state;
                    reduce(
                        &mut state,
                        Action::Merged {
                            draft: merged.clone(),
                            version: record.version,
                            dirty,
                        },
                    );
                    self.publish(&state);
                    (merged, dirty)
                };
                if let Err(e) = self.cache.save(&merged) {
                    tracing::warn!("Failed to write draft cache: {}", e);
                }
                tracing::debug!(version = record.version, dirty, "Adopted merged draft");
                if dirty {
                    // Re-arm the debounce: the pending window may have fired
                    // (and been skipped) while the merge was in flight
                    self.edit_seq.fetch_add(1, Ordering::AcqRel);
                    self.edit_notify.notify_one();
                }
            }
            Err(StoreError::NotConfigured) => {
                self.dispatch(Action::MergeFailed).await;
                self.dispatch(Action::StoreAbsent).await;
            }
            Err(e) => {
                tracing::debug!("Merge fetch failed: {}", e);
                self.dispatch(Action::MergeFailed).await;
            }
        }
    }

    /// Finishes a poll round that needed no merge.
    ///
    /// Clears a sticky failure status via the reducer, and if a save failed
    /// while the store was down, re-arms the debounce so the pending edits
    /// are retried now that the store answered.
    async fn poll_round_ok(&self) {
        let dirty = {
            let mut state = self.state.lock().await;
            reduce(&mut state, Action::PollNoop);
            self.publish(&state);
            state.dirty
        };
        if dirty {
            self.edit_seq.fetch_add(1, Ordering::AcqRel);
            self.edit_notify.notify_one();
        }
    }

    /// Starts the debounce and poll timers.
    ///
    /// Dropping (or stopping) the returned handle aborts both loops;
    /// in-flight requests are not interrupted.
    pub fn start(self: &Arc<Self>) -> SyncHandle {
        let manager = Arc::clone(self);
        let debounce = tokio::spawn(async move { manager.debounce_loop().await });

        let manager = Arc::clone(self);
        let poll = tokio::spawn(async move { manager.poll_loop().await });

        SyncHandle {
            tasks: vec![debounce, poll],
        }
    }

    async fn debounce_loop(self: Arc<Self>) {
        loop {
            self.edit_notify.notified().await;
            // Keep extending the window while edits are still arriving
            loop {
                let seen = self.edit_seq.load(Ordering::Acquire);
                tokio::time::sleep(self.debounce).await;
                if self.edit_seq.load(Ordering::Acquire) == seen {
                    break;
                }
            }
            self.save_now().await;
        }
    }

    async fn poll_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.poll_once().await;
        }
    }

    async fn dispatch(&self, action: Action) {
        let mut state = self.state.lock().await;
        reduce(&mut state, action);
        self.publish(&state);
    }

    fn publish(&self, state: &SyncState) {
        self.watch_tx.send_replace(state.clone());
    }
}

impl SyncManager<HttpDraftStore> {
    /// Builds a manager from client configuration.
    ///
    /// Resolves the persistent editor identity from the data directory; an
    /// absent `server_url` yields a local-only session.
    pub fn from_config(config: &Config) -> Result<Self, IdentityError> {
        let identity = EditorIdentity::load_or_create(&config.data_dir)?;
        let store = config
            .server_url
            .as_ref()
            .map(|url| HttpDraftStore::new(url.clone()));

        Ok(Self::new(
            store,
            DraftCache::new(&config.data_dir),
            identity.id(),
            Duration::from_millis(config.debounce_ms),
            Duration::from_secs(config.poll_interval_secs),
        ))
    }
}

/// Handle to the running timer loops.
pub struct SyncHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SyncHandle {
    /// Stops the timers. Equivalent to dropping the handle.
    pub fn stop(self) {}
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
