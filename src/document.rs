//! Draft document model and field-group partitioning.
//!
//! A draft is a single JSON record of named fields. Fields are partitioned
//! into fixed, disjoint *field groups*: sets of fields that one editing
//! workflow always reads and writes together (the header form, the story
//! picker, and so on). The merge engine treats a group as atomic - either the
//! whole group is taken from one side or the whole group from the other.
//!
//! Fields that belong to no group are server-owned metadata (for example
//! `lastSaved`, stamped by the store on every write). They are never merged;
//! the remote value always wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named set of draft fields that is edited and merged as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGroup {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

/// The closed field-group mapping shared by the client and the merge engine.
///
/// Groups are disjoint. Any field not listed here is treated as
/// always-remote.
pub const FIELD_GROUPS: &[FieldGroup] = &[
    FieldGroup {
        name: "header",
        fields: &["subject", "previewText", "issueDate", "logoUrl"],
    },
    FieldGroup {
        name: "intro",
        fields: &["introHeading", "introText"],
    },
    FieldGroup {
        name: "stories",
        fields: &["postList", "layoutDefault"],
    },
    FieldGroup {
        name: "sponsor",
        fields: &["sponsorName", "sponsorUrl", "sponsorBlurb"],
    },
    FieldGroup {
        name: "footer",
        fields: &["footerText"],
    },
];

/// Looks up a field group by name.
pub fn field_group(name: &str) -> Option<&'static FieldGroup> {
    FIELD_GROUPS.iter().find(|g| g.name == name)
}

/// Returns true if the field belongs to some field group.
///
/// Fields outside every group are always-remote.
pub fn is_grouped_field(field: &str) -> bool {
    FIELD_GROUPS.iter().any(|g| g.fields.contains(&field))
}

/// The shared editable draft record.
///
/// Stored as a JSON map so that field values can be arbitrarily nested
/// (the story list is an array of objects, layouts are maps) and so that
/// fields the client does not know about pass through untouched as
/// always-remote. Equality is full structural comparison via
/// [`serde_json::Value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft(Map<String, Value>);

impl Draft {
    /// Creates an empty draft.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets a field value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Removes a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Returns true if the draft has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares the given fields of two drafts, jointly and deeply.
    ///
    /// Absent fields only match absent fields.
    pub fn fields_equal(&self, other: &Draft, fields: &[&str]) -> bool {
        fields.iter().all(|f| self.get(f) == other.get(f))
    }

    /// Iterates over all `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Draft {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Draft> for Value {
    fn from(draft: Draft) -> Self {
        Value::Object(draft.0)
    }
}
