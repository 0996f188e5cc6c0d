//! Global per-slot portlet storage.
//!
//! A slot's site-wide assignments live in a [`PortletManager`]: category
//! (`user`, `group`, ...) to key (user id, group id, ...) to
//! [`AssignmentStore`].  Every key passes through one canonical text
//! coercion, so byte-string and text lookups land in the same cell.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assignment::{AssignmentStore, PortletAssignment, StoreRef};

// ---------------------------------------------------------------------------
// Storage keys
// ---------------------------------------------------------------------------

/// Canonical text form of a category key.
///
/// Keys arrive from principal ids, group ids, and content type names in
/// whatever representation the surrounding system uses.  Byte keys that are
/// not valid UTF-8 are decoded lossily with a warning rather than rejected:
/// a key must never make storage lookups fail.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn from_text(text: &str) -> Self {
        Self(text.to_string())
    }

    /// Decode a byte key.  Invalid UTF-8 is replaced, not rejected.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self(text.to_string()),
            Err(_) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                tracing::warn!(key = %text, "storage key is not valid utf-8; replaced offending bytes");
                Self(text)
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorageKey {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for StorageKey {
    fn from(text: String) -> Self {
        Self(text)
    }
}

// ---------------------------------------------------------------------------
// Manager kind
// ---------------------------------------------------------------------------

/// Retrieval variant a slot uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerKind {
    /// Contextual hierarchy walk plus the global categories.
    Placeful,
    /// Principal-bound categories only; hierarchy and blacklists are
    /// ignored.
    Placeless,
}

impl ManagerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placeful => "placeful",
            Self::Placeless => "placeless",
        }
    }
}

impl fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Category mapping
// ---------------------------------------------------------------------------

/// Key-to-store mapping for one category of one slot.  Stores are created
/// on first write, already addressed, so saved assignments carry a full
/// owner reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMapping {
    slot: String,
    category: String,
    stores: BTreeMap<StorageKey, AssignmentStore>,
}

impl CategoryMapping {
    fn new(slot: &str, category: &str) -> Self {
        Self {
            slot: slot.to_string(),
            category: category.to_string(),
            stores: BTreeMap::new(),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StorageKey> {
        self.stores.keys()
    }

    pub fn store(&self, key: &StorageKey) -> Option<&AssignmentStore> {
        self.stores.get(key)
    }

    /// Store under `key`, created on first use with its full address.
    pub fn store_mut(&mut self, key: &StorageKey) -> &mut AssignmentStore {
        let (slot, category) = (self.slot.clone(), self.category.clone());
        self.stores.entry(key.clone()).or_insert_with(|| {
            AssignmentStore::addressed(StoreRef {
                slot,
                category,
                key: key.as_str().to_string(),
            })
        })
    }

    pub fn remove(&mut self, key: &StorageKey) -> Option<AssignmentStore> {
        self.stores.remove(key)
    }
}

// ---------------------------------------------------------------------------
// Portlet manager
// ---------------------------------------------------------------------------

/// Site-wide storage and identity of one placement slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortletManager {
    name: String,
    kind: ManagerKind,
    /// Marker features consulted by the portlet type applies-to filter.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    features: BTreeSet<String>,
    categories: BTreeMap<String, CategoryMapping>,
}

impl PortletManager {
    pub fn new(name: &str, kind: ManagerKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            features: BTreeSet::new(),
            categories: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ManagerKind {
        self.kind
    }

    pub fn add_feature(&mut self, feature: &str) {
        self.features.insert(feature.to_string());
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    pub fn category(&self, category: &str) -> Option<&CategoryMapping> {
        self.categories.get(category)
    }

    /// Mapping for `category`, created on first use.
    pub fn category_mut(&mut self, category: &str) -> &mut CategoryMapping {
        let slot = self.name.clone();
        self.categories
            .entry(category.to_string())
            .or_insert_with(|| CategoryMapping::new(&slot, category))
    }

    /// Store of one cell, when it exists.
    pub fn store(&self, category: &str, key: &StorageKey) -> Option<&AssignmentStore> {
        self.categories
            .get(category)
            .and_then(|mapping| mapping.store(key))
    }

    /// Save into `category`/`key`, creating the cell on first use.  Returns
    /// the name the assignment was stored under.
    pub fn save_assignment(
        &mut self,
        category: &str,
        key: &StorageKey,
        assignment: PortletAssignment,
    ) -> String {
        self.category_mut(category).store_mut(key).save(assignment)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
