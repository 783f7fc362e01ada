//! Sync state machine: status, in-flight tracking, and the pure reducer.
//!
//! All client-side sync state lives in one [`SyncState`] value, and the only
//! way to change it is to run an [`Action`] through [`reduce`]. The reducer
//! performs no IO; the manager is the effect scheduler that talks to the
//! store and cache, then dispatches the outcome back in as actions. That
//! split keeps every transition unit-testable without timers or a network.
//!
//! The snapshot (merge base) and the confirmed version are only ever updated
//! together, inside a single reducer step - the merge algorithm's change
//! detection depends on the two never drifting apart.

use crate::document::Draft;

/// Where the session stands relative to the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No store configured; edits live only in the fallback cache.
    LocalOnly,
    /// Local state and the store agree as of the last sync.
    Synced,
    /// A debounced save is being written to the store.
    Saving,
    /// A newer remote version is being fetched and merged.
    Syncing,
    /// The store is unreachable; edits accumulate locally until it returns.
    Offline,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::LocalOnly => "local-only",
            SyncStatus::Synced => "synced",
            SyncStatus::Saving => "saving",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single in-flight operation slot.
///
/// A save and a merge adoption must never interleave on the same local
/// state, so instead of two boolean flags this is one mutually-exclusive
/// slot; an illegal overlapping start trips a debug assertion in the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    Idle,
    Saving,
    Merging,
}

/// Complete sync state for one client session.
#[derive(Debug, Clone)]
pub struct SyncState {
    /// The live local draft, mutated by edits and merge adoptions.
    pub draft: Draft,
    /// The draft as of the last two-way sync; the three-way merge base.
    pub snapshot: Draft,
    /// Last store version this session has confirmed.
    pub version: u64,
    pub status: SyncStatus,
    pub flight: Flight,
    /// True when the draft has edits the store has not seen.
    pub dirty: bool,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            draft: Draft::new(),
            snapshot: Draft::new(),
            version: 0,
            status: SyncStatus::LocalOnly,
            flight: Flight::Idle,
            dirty: false,
        }
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

/// State transitions. Dispatched by the manager, applied by [`reduce`].
#[derive(Debug, Clone)]
pub enum Action {
    /// Bootstrap read the store successfully (or found it empty).
    Bootstrapped { draft: Draft, version: u64 },
    /// Bootstrap could not use the store; fall back to the cached draft.
    BootstrapFallback {
        cached: Option<Draft>,
        configured: bool,
    },
    /// A local edit replaced the draft.
    Edited { draft: Draft },
    /// A store write began for the current draft.
    SaveStarted,
    /// The store accepted a write; `draft` is exactly what was written.
    Saved { draft: Draft, version: u64 },
    /// The store write failed.
    SaveFailed { configured: bool },
    /// A newer remote version was observed; fetch-and-merge began.
    MergeStarted,
    /// The merge engine produced `draft` for remote `version`.
    ///
    /// `dirty` is true when the merge kept local group edits the store has
    /// not seen (merged != fetched remote); those still need a save even
    /// though the merged draft becomes the new snapshot.
    Merged {
        draft: Draft,
        version: u64,
        dirty: bool,
    },
    /// The remote fetch behind a merge failed.
    MergeFailed,
    /// A poll round needed no action but confirmed the store is reachable.
    PollNoop,
    /// A poll round failed on the network.
    WentOffline,
    /// The store reported itself unconfigured.
    StoreAbsent,
}

/// Applies an action to the state. Pure: no IO, no timers.
pub fn reduce(state: &mut SyncState, action: Action) {
    match action {
        Action::Bootstrapped { draft, version } => {
            state.draft = draft.clone();
            state.snapshot = draft;
            state.version = version;
            state.status = SyncStatus::Synced;
            state.flight = Flight::Idle;
            state.dirty = false;
        }
        Action::BootstrapFallback { cached, configured } => {
            if let Some(draft) = cached {
                state.draft = draft;
                // The cache may hold edits that never reached the store
                state.dirty = true;
            }
            state.status = if configured {
                SyncStatus::Offline
            } else {
                SyncStatus::LocalOnly
            };
        }
        Action::Edited { draft } => {
            state.draft = draft;
            state.dirty = true;
        }
        Action::SaveStarted => {
            debug_assert_eq!(state.flight, Flight::Idle, "save started while busy");
            state.flight = Flight::Saving;
            state.status = SyncStatus::Saving;
        }
        Action::Saved { draft, version } => {
            state.snapshot = draft;
            state.version = version;
            state.flight = Flight::Idle;
            state.status = SyncStatus::Synced;
            // Edits may have landed while the write was in flight
            state.dirty = state.draft != state.snapshot;
        }
        Action::SaveFailed { configured } => {
            state.flight = Flight::Idle;
            state.status = if configured {
                SyncStatus::Offline
            } else {
                SyncStatus::LocalOnly
            };
        }
        Action::MergeStarted => {
            debug_assert_eq!(state.flight, Flight::Idle, "merge started while busy");
            state.flight = Flight::Merging;
            state.status = SyncStatus::Syncing;
        }
        Action::Merged {
            draft,
            version,
            dirty,
        } => {
            state.draft = draft.clone();
            state.snapshot = draft;
            state.version = version;
            state.flight = Flight::Idle;
            state.status = SyncStatus::Synced;
            state.dirty = dirty;
        }
        Action::MergeFailed => {
            state.flight = Flight::Idle;
            state.status = SyncStatus::Offline;
        }
        Action::PollNoop => {
            // A successful round clears a sticky offline/local-only status,
            // but not while edits are still waiting to be written; the
            // session only reports synced once the retried save lands
            if !state.dirty
                && (state.status == SyncStatus::Offline || state.status == SyncStatus::LocalOnly)
            {
                state.status = SyncStatus::Synced;
            }
        }
        Action::WentOffline => {
            state.status = SyncStatus::Offline;
        }
        Action::StoreAbsent => {
            state.status = SyncStatus::LocalOnly;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft_with(field: &str, value: serde_json::Value) -> Draft {
        let mut d = Draft::new();
        d.set(field, value);
        d
    }

    #[test]
    fn test_bootstrapped_adopts_draft_and_snapshot_together() {
        let mut state = SyncState::new();
        let draft = draft_with("subject", json!("A"));

        reduce(
            &mut state,
            Action::Bootstrapped {
                draft: draft.clone(),
                version: 3,
            },
        );

        assert_eq!(state.draft, draft);
        assert_eq!(state.snapshot, draft);
        assert_eq!(state.version, 3);
        assert_eq!(state.status, SyncStatus::Synced);
        assert!(!state.dirty);
    }

    #[test]
    fn test_bootstrap_fallback_statuses() {
        let mut state = SyncState::new();
        reduce(
            &mut state,
            Action::BootstrapFallback {
                cached: Some(draft_with("subject", json!("cached"))),
                configured: false,
            },
        );
        assert_eq!(state.status, SyncStatus::LocalOnly);
        assert_eq!(state.draft.get("subject"), Some(&json!("cached")));
        // The cached draft may hold edits the store never saw
        assert!(state.dirty);

        let mut state = SyncState::new();
        reduce(
            &mut state,
            Action::BootstrapFallback {
                cached: None,
                configured: true,
            },
        );
        assert_eq!(state.status, SyncStatus::Offline);
        assert!(state.draft.is_empty());
    }

    #[test]
    fn test_edit_marks_dirty() {
        let mut state = SyncState::new();
        reduce(
            &mut state,
            Action::Edited {
                draft: draft_with("subject", json!("B")),
            },
        );
        assert!(state.dirty);
        assert_eq!(state.draft.get("subject"), Some(&json!("B")));
    }

    #[test]
    fn test_edit_lands_while_merging() {
        let mut state = SyncState::new();
        reduce(&mut state, Action::MergeStarted);

        reduce(
            &mut state,
            Action::Edited {
                draft: draft_with("subject", json!("mid-merge edit")),
            },
        );
        assert_eq!(state.draft.get("subject"), Some(&json!("mid-merge edit")));
        assert!(state.dirty);
        // The merge itself is unaffected
        assert_eq!(state.flight, Flight::Merging);
    }

    #[test]
    fn test_save_cycle() {
        let mut state = SyncState::new();
        let draft = draft_with("subject", json!("B"));
        reduce(
            &mut state,
            Action::Edited {
                draft: draft.clone(),
            },
        );

        reduce(&mut state, Action::SaveStarted);
        assert_eq!(state.flight, Flight::Saving);
        assert_eq!(state.status, SyncStatus::Saving);

        reduce(
            &mut state,
            Action::Saved {
                draft: draft.clone(),
                version: 1,
            },
        );
        assert_eq!(state.flight, Flight::Idle);
        assert_eq!(state.status, SyncStatus::Synced);
        assert_eq!(state.snapshot, draft);
        assert_eq!(state.version, 1);
        assert!(!state.dirty);
    }

    #[test]
    fn test_save_completion_keeps_newer_edits_dirty() {
        let mut state = SyncState::new();
        let written = draft_with("subject", json!("v1"));
        reduce(
            &mut state,
            Action::Edited {
                draft: written.clone(),
            },
        );
        reduce(&mut state, Action::SaveStarted);

        // Another edit lands while the write is in flight
        reduce(
            &mut state,
            Action::Edited {
                draft: draft_with("subject", json!("v2")),
            },
        );

        reduce(
            &mut state,
            Action::Saved {
                draft: written,
                version: 1,
            },
        );
        assert!(state.dirty, "in-flight edits must survive the save");
        assert_eq!(state.draft.get("subject"), Some(&json!("v2")));
        assert_eq!(state.snapshot.get("subject"), Some(&json!("v1")));
    }

    #[test]
    fn test_save_failed_statuses() {
        let mut state = SyncState::new();
        reduce(&mut state, Action::SaveStarted);
        reduce(&mut state, Action::SaveFailed { configured: true });
        assert_eq!(state.status, SyncStatus::Offline);
        assert_eq!(state.flight, Flight::Idle);

        reduce(&mut state, Action::SaveStarted);
        reduce(&mut state, Action::SaveFailed { configured: false });
        assert_eq!(state.status, SyncStatus::LocalOnly);
    }

    #[test]
    fn test_merge_adoption_updates_base_and_version_atomically() {
        let mut state = SyncState::new();
        reduce(&mut state, Action::MergeStarted);

        let merged = draft_with("subject", json!("merged"));
        reduce(
            &mut state,
            Action::Merged {
                draft: merged.clone(),
                version: 7,
                dirty: false,
            },
        );
        assert_eq!(state.draft, merged);
        assert_eq!(state.snapshot, merged);
        assert_eq!(state.version, 7);
        assert_eq!(state.status, SyncStatus::Synced);
        assert!(!state.dirty);
    }

    #[test]
    fn test_merge_adoption_can_stay_dirty() {
        // When the merge kept local group edits the remote has not seen,
        // the adoption leaves the session dirty so a save still happens
        let mut state = SyncState::new();
        reduce(&mut state, Action::MergeStarted);
        reduce(
            &mut state,
            Action::Merged {
                draft: draft_with("subject", json!("kept local")),
                version: 7,
                dirty: true,
            },
        );
        assert!(state.dirty);
        assert_eq!(state.status, SyncStatus::Synced);
    }

    #[test]
    fn test_poll_noop_clears_sticky_offline() {
        let mut state = SyncState::new();
        reduce(&mut state, Action::WentOffline);
        assert_eq!(state.status, SyncStatus::Offline);

        reduce(&mut state, Action::PollNoop);
        assert_eq!(state.status, SyncStatus::Synced);

        // And it leaves a healthy status alone
        reduce(&mut state, Action::PollNoop);
        assert_eq!(state.status, SyncStatus::Synced);
    }

    #[test]
    fn test_poll_noop_keeps_offline_while_dirty() {
        // A reachable store is not "synced" while a failed save is pending;
        // the status clears only once the retried save lands
        let mut state = SyncState::new();
        reduce(
            &mut state,
            Action::Edited {
                draft: draft_with("subject", json!("unsaved")),
            },
        );
        reduce(&mut state, Action::WentOffline);

        reduce(&mut state, Action::PollNoop);
        assert_eq!(state.status, SyncStatus::Offline);

        reduce(&mut state, Action::SaveStarted);
        reduce(
            &mut state,
            Action::Saved {
                draft: draft_with("subject", json!("unsaved")),
                version: 1,
            },
        );
        assert_eq!(state.status, SyncStatus::Synced);
        assert!(!state.dirty);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(SyncStatus::LocalOnly.to_string(), "local-only");
        assert_eq!(SyncStatus::Synced.to_string(), "synced");
        assert_eq!(SyncStatus::Saving.to_string(), "saving");
        assert_eq!(SyncStatus::Syncing.to_string(), "syncing");
        assert_eq!(SyncStatus::Offline.to_string(), "offline");
    }
}
