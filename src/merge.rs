//! Three-way draft merge at field-group granularity.
//!
//! Reconciles a locally edited draft with a newer remote draft using the
//! last-synced snapshot as the base. For each field group: if the local copy
//! of the group is unchanged from the base, the remote group is accepted;
//! otherwise the local in-progress edit is kept and the remote change to that
//! group is dropped. Always-remote fields (anything outside the group
//! mapping) are taken from the remote draft unconditionally.
//!
//! Known tradeoff: when two editors touch the *same* group between syncs, one
//! editor's whole group of changes is silently discarded. Convergence is per
//! group, last editor wins; there is no conflict signal. That is the
//! consistency model, not a defect.

use crate::document::{Draft, FIELD_GROUPS};

/// Merges `local` and `remote` against the common `base`.
///
/// Pure and idempotent: `merge(x, x, x) == x`. Only ever copies whole field
/// values from one of the three inputs, never constructs new ones.
pub fn merge(local: &Draft, remote: &Draft, base: &Draft) -> Draft {
    // Start from remote: that covers every unchanged group and all
    // always-remote fields in one move.
    let mut merged = remote.clone();

    for group in FIELD_GROUPS {
        // A group is atomic: one touched field makes the whole group dirty.
        let locally_dirty = !local.fields_equal(base, group.fields);
        if !locally_dirty {
            continue;
        }
        for field in group.fields {
            match local.get(field) {
                Some(value) => merged.set(*field, value.clone()),
                None => {
                    merged.remove(field);
                }
            }
        }
    }

    merged
}
