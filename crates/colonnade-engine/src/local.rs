//! Per-context local assignments and blacklist state.
//!
//! Every (context, slot) pair owns at most one [`LocalAssignmentManager`]:
//! the context's own assignment store plus its per-category blacklist
//! entries.  The [`LocalAssignmentRegistry`] side-table replaces attribute
//! annotations on content objects; engine state stays in one owned
//! structure keyed by context uid and slot name, created lazily on first
//! write and dropped explicitly when a context goes away.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assignment::{AssignmentStore, StoreRef};
use crate::constants::CONTEXT_CATEGORY;

// ---------------------------------------------------------------------------
// Blacklist tri-state
// ---------------------------------------------------------------------------

/// Per-category blacklist entry of one context.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    /// Hide the category here and below, until a descendant overrides.
    Blacklisted,
    /// Show the category here and below, overriding an ancestor.
    Whitelisted,
    /// No local opinion; acquire from the parent chain.
    #[default]
    Unset,
}

impl TriState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blacklisted => "blacklisted",
            Self::Whitelisted => "whitelisted",
            Self::Unset => "unset",
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Local assignment manager
// ---------------------------------------------------------------------------

/// Local portlet state of one context for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAssignmentManager {
    context_uid: String,
    slot: String,
    assignments: AssignmentStore,
    /// Sparse: only non-`Unset` entries are kept.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    blacklist: BTreeMap<String, TriState>,
}

impl LocalAssignmentManager {
    fn new(context_uid: &str, slot: &str) -> Self {
        let address = StoreRef {
            slot: slot.to_string(),
            category: CONTEXT_CATEGORY.to_string(),
            key: context_uid.to_string(),
        };
        Self {
            context_uid: context_uid.to_string(),
            slot: slot.to_string(),
            assignments: AssignmentStore::addressed(address),
            blacklist: BTreeMap::new(),
        }
    }

    pub fn context_uid(&self) -> &str {
        &self.context_uid
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn assignments(&self) -> &AssignmentStore {
        &self.assignments
    }

    pub fn assignments_mut(&mut self) -> &mut AssignmentStore {
        &mut self.assignments
    }

    /// Local entry for `category`; `Unset` when none was recorded.
    pub fn blacklist_status(&self, category: &str) -> TriState {
        self.blacklist
            .get(category)
            .copied()
            .unwrap_or(TriState::Unset)
    }

    /// Record a local entry.  `Unset` clears it back to acquisition.
    pub fn set_blacklist_status(&mut self, category: &str, status: TriState) {
        match status {
            TriState::Unset => {
                self.blacklist.remove(category);
            }
            _ => {
                self.blacklist.insert(category.to_string(), status);
            }
        }
    }

    /// Recorded entries, category-ordered.
    pub fn blacklist_entries(&self) -> impl Iterator<Item = (&str, TriState)> {
        self.blacklist
            .iter()
            .map(|(category, status)| (category.as_str(), *status))
    }
}

// ---------------------------------------------------------------------------
// Registry side-table
// ---------------------------------------------------------------------------

/// Side-table of every context's local portlet state, keyed by context uid
/// and then slot name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalAssignmentRegistry {
    contexts: BTreeMap<String, BTreeMap<String, LocalAssignmentManager>>,
}

impl LocalAssignmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local manager for (context, slot), when one was ever written.
    pub fn get(&self, context_uid: &str, slot: &str) -> Option<&LocalAssignmentManager> {
        self.contexts.get(context_uid)?.get(slot)
    }

    /// Local manager for (context, slot), created on first write.
    pub fn for_context(&mut self, context_uid: &str, slot: &str) -> &mut LocalAssignmentManager {
        self.contexts
            .entry(context_uid.to_string())
            .or_default()
            .entry(slot.to_string())
            .or_insert_with(|| LocalAssignmentManager::new(context_uid, slot))
    }

    /// Drop every slot's local state for a context.  Returns whether
    /// anything was present.
    pub fn remove_context(&mut self, context_uid: &str) -> bool {
        self.contexts.remove(context_uid).is_some()
    }

    /// Drop one (context, slot) entry.
    pub fn remove(&mut self, context_uid: &str, slot: &str) -> bool {
        let Some(slots) = self.contexts.get_mut(context_uid) else {
            return false;
        };
        let removed = slots.remove(slot).is_some();
        if slots.is_empty() {
            self.contexts.remove(context_uid);
        }
        removed
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
