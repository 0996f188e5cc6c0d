//! Ordered, keyed assignment containers.
//!
//! A [`PortletAssignment`] names one placed portlet and carries the opaque
//! payload its renderer is built from.  Assignments live in an
//! [`AssignmentStore`], an ordered container whose keys are the stringified
//! display positions `"0"`, `"1"`, ...: every mutation re-establishes that
//! numbering before returning, so key and position never disagree.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Assignment settings
// ---------------------------------------------------------------------------

/// Open per-assignment switches kept beside the payload rather than inside
/// it: UI-level toggles a management screen may set without understanding
/// the portlet's own data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSettings {
    values: BTreeMap<String, Value>,
}

impl AssignmentSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Store address
// ---------------------------------------------------------------------------

/// Address of an [`AssignmentStore`] within a slot: which category cell or
/// which context it belongs to.  Stamped on assignments as the owner
/// back-reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreRef {
    /// Slot (portlet manager) name.
    pub slot: String,
    pub category: String,
    pub key: String,
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.slot, self.category, self.key)
    }
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

/// One placed portlet: the unit resolution selects and orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortletAssignment {
    /// Key within the owning store; equal to the stringified display index
    /// while stored.
    pub name: String,
    /// Assignment-level availability switch, consulted by the default
    /// render filter.
    pub available: bool,
    /// Opaque payload handed to the renderer adaptation unchanged.
    pub data: Value,
    /// UI-level switches that are not part of the payload.
    #[serde(default, skip_serializing_if = "AssignmentSettings::is_empty")]
    pub settings: AssignmentSettings,
    /// Store currently holding this assignment, when it has an address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<StoreRef>,
}

impl PortletAssignment {
    /// New available assignment.  The name is provisional: saving into a
    /// store under an unknown name rewrites it to the next display index.
    pub fn new(name: &str, data: Value) -> Self {
        Self {
            name: name.to_string(),
            available: true,
            data,
            settings: AssignmentSettings::default(),
            owner: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Store mutation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    /// No assignment under the given key.
    KeyNotFound { key: String },
    /// Requested display position outside `[0, len)`.
    IndexOutOfRange { index: usize, len: usize },
}

impl StoreError {
    /// Stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::KeyNotFound { .. } => "STORE_KEY_NOT_FOUND",
            Self::IndexOutOfRange { .. } => "STORE_INDEX_OUT_OF_RANGE",
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyNotFound { key } => write!(f, "no assignment under key `{key}`"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "display position {index} out of range for store of length {len}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Assignment store
// ---------------------------------------------------------------------------

/// Ordered keyed container of assignments for one category cell or one
/// context.
///
/// Standing invariant: entry names are exactly `"0".."n-1"` and equal each
/// entry's display position.  `save` addresses an existing key in place and
/// appends otherwise; `move_to` and `delete` renumber the survivors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentStore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<StoreRef>,
    entries: Vec<PortletAssignment>,
}

impl AssignmentStore {
    /// Unaddressed store; assignments saved here carry no owner reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that stamps `address` on every saved assignment.
    pub fn addressed(address: StoreRef) -> Self {
        Self {
            address: Some(address),
            entries: Vec::new(),
        }
    }

    pub fn address(&self) -> Option<&StoreRef> {
        self.address.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &PortletAssignment> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&PortletAssignment> {
        self.position(key).map(|pos| &self.entries[pos])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Insert or replace.  A known name replaces in place and keeps its
    /// position; an unknown name appends and is renamed to the next free
    /// display index.  Returns the name the assignment was stored under.
    pub fn save(&mut self, mut assignment: PortletAssignment) -> String {
        assignment.owner = self.address.clone();
        match self.position(&assignment.name) {
            Some(pos) => {
                let name = assignment.name.clone();
                self.entries[pos] = assignment;
                name
            }
            None => {
                assignment.name = self.entries.len().to_string();
                let name = assignment.name.clone();
                self.entries.push(assignment);
                name
            }
        }
    }

    /// Move `key` to display position `index`, renumbering every entry.
    pub fn move_to(&mut self, key: &str, index: usize) -> Result<(), StoreError> {
        if index >= self.entries.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let pos = self.position(key).ok_or_else(|| StoreError::KeyNotFound {
            key: key.to_string(),
        })?;
        let entry = self.entries.remove(pos);
        self.entries.insert(index, entry);
        self.renumber();
        Ok(())
    }

    /// Remove `key` and renumber the remainder.  The removed assignment is
    /// returned with its owner reference cleared.
    pub fn delete(&mut self, key: &str) -> Result<PortletAssignment, StoreError> {
        let pos = self.position(key).ok_or_else(|| StoreError::KeyNotFound {
            key: key.to_string(),
        })?;
        let mut removed = self.entries.remove(pos);
        removed.owner = None;
        self.renumber();
        Ok(removed)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == key)
    }

    fn renumber(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.name = index.to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- helpers ------------------------------------------------------------

    fn asg(name: &str, label: &str) -> PortletAssignment {
        PortletAssignment::new(name, json!({ "label": label }))
    }

    fn labels(store: &AssignmentStore) -> Vec<String> {
        store
            .iter()
            .map(|entry| entry.data["label"].as_str().unwrap().to_string())
            .collect()
    }

    fn names(store: &AssignmentStore) -> Vec<String> {
        store.iter().map(|entry| entry.name.clone()).collect()
    }

    fn sample_address() -> StoreRef {
        StoreRef {
            slot: "sidebar".to_string(),
            category: "user".to_string(),
            key: "bob".to_string(),
        }
    }

    // -- saving -------------------------------------------------------------

    #[test]
    fn save_appends_under_display_index() {
        let mut store = AssignmentStore::new();
        assert_eq!(store.save(asg("news", "a")), "0");
        assert_eq!(store.save(asg("events", "b")), "1");
        assert_eq!(store.save(asg("search", "c")), "2");
        assert_eq!(names(&store), ["0", "1", "2"]);
        assert_eq!(labels(&store), ["a", "b", "c"]);
    }

    #[test]
    fn save_replaces_known_key_in_place() {
        let mut store = AssignmentStore::new();
        store.save(asg("x", "a"));
        store.save(asg("x", "b"));
        assert_eq!(store.save(asg("0", "a2")), "0");
        assert_eq!(store.len(), 2);
        assert_eq!(labels(&store), ["a2", "b"]);
        assert_eq!(names(&store), ["0", "1"]);
    }

    #[test]
    fn save_stamps_owner_from_address() {
        let mut store = AssignmentStore::addressed(sample_address());
        let name = store.save(asg("x", "a"));
        assert_eq!(store.get(&name).unwrap().owner, Some(sample_address()));

        let mut unaddressed = AssignmentStore::new();
        let name = unaddressed.save(asg("x", "a"));
        assert_eq!(unaddressed.get(&name).unwrap().owner, None);
    }

    // -- moving -------------------------------------------------------------

    #[test]
    fn move_renumbers_to_display_order() {
        let mut store = AssignmentStore::new();
        store.save(asg("x", "a"));
        store.save(asg("x", "b"));
        store.save(asg("x", "c"));
        store.move_to("2", 0).unwrap();
        assert_eq!(labels(&store), ["c", "a", "b"]);
        assert_eq!(names(&store), ["0", "1", "2"]);
    }

    #[test]
    fn move_to_end_position() {
        let mut store = AssignmentStore::new();
        store.save(asg("x", "a"));
        store.save(asg("x", "b"));
        store.move_to("0", 1).unwrap();
        assert_eq!(labels(&store), ["b", "a"]);
        assert_eq!(names(&store), ["0", "1"]);
    }

    #[test]
    fn move_rejects_out_of_range_index() {
        let mut store = AssignmentStore::new();
        store.save(asg("x", "a"));
        let err = store.move_to("0", 1).unwrap_err();
        assert_eq!(err, StoreError::IndexOutOfRange { index: 1, len: 1 });

        let mut empty = AssignmentStore::new();
        let err = empty.move_to("0", 0).unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfRange { .. }));
    }

    #[test]
    fn move_rejects_unknown_key() {
        let mut store = AssignmentStore::new();
        store.save(asg("x", "a"));
        let err = store.move_to("7", 0).unwrap_err();
        assert_eq!(
            err,
            StoreError::KeyNotFound {
                key: "7".to_string()
            }
        );
    }

    // -- deleting -----------------------------------------------------------

    #[test]
    fn delete_renumbers_and_clears_owner() {
        let mut store = AssignmentStore::addressed(sample_address());
        store.save(asg("x", "a"));
        store.save(asg("x", "b"));
        store.save(asg("x", "c"));
        let removed = store.delete("0").unwrap();
        assert_eq!(removed.owner, None);
        assert_eq!(removed.data["label"], "a");
        assert_eq!(labels(&store), ["b", "c"]);
        assert_eq!(names(&store), ["0", "1"]);
    }

    #[test]
    fn delete_rejects_unknown_key() {
        let mut store = AssignmentStore::new();
        let err = store.delete("0").unwrap_err();
        assert!(matches!(err, StoreError::KeyNotFound { .. }));
        assert_eq!(err.error_code(), "STORE_KEY_NOT_FOUND");
    }

    #[test]
    fn save_after_delete_reuses_freed_index() {
        let mut store = AssignmentStore::new();
        store.save(asg("x", "a"));
        store.save(asg("x", "b"));
        store.delete("0").unwrap();
        assert_eq!(store.save(asg("x", "c")), "1");
        assert_eq!(labels(&store), ["b", "c"]);
        assert_eq!(names(&store), ["0", "1"]);
    }

    // -- settings -----------------------------------------------------------

    #[test]
    fn settings_set_get_remove() {
        let mut settings = AssignmentSettings::new();
        assert!(settings.is_empty());
        settings.set("visible", json!(false));
        assert_eq!(settings.get("visible"), Some(&json!(false)));
        assert_eq!(settings.len(), 1);
        assert_eq!(settings.remove("visible"), Some(json!(false)));
        assert!(settings.is_empty());
    }

    #[test]
    fn settings_travel_with_the_assignment() {
        let mut assignment = asg("x", "a");
        assignment.settings.set("visible", json!(true));
        let mut store = AssignmentStore::new();
        let name = store.save(assignment);
        assert_eq!(
            store.get(&name).unwrap().settings.get("visible"),
            Some(&json!(true))
        );
    }

    // -- errors -------------------------------------------------------------

    #[test]
    fn error_display_and_codes() {
        let err = StoreError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.error_code(), "STORE_INDEX_OUT_OF_RANGE");
        assert_eq!(
            err.to_string(),
            "display position 4 out of range for store of length 2"
        );
        let err = StoreError::KeyNotFound {
            key: "9".to_string(),
        };
        assert_eq!(err.to_string(), "no assignment under key `9`");
    }
}
