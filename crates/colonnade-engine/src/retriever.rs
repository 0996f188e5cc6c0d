//! Portlet resolution.
//!
//! Computes the ordered assignment list for one context and one slot:
//! contextual assignments acquired up the parent chain, then the context's
//! global categories, filtered through blacklist entries that are
//! themselves acquired with nearest-ancestor-wins.
//!
//! The `context` category is special twice over.  Its acquired tri-state
//! behaves like any other category's: a `Blacklisted` inherited from an
//! ancestor blacks out the whole contextual family, the viewed context's
//! own assignments included, and a nearer `Whitelisted` cancels that.  A
//! node's own `Blacklisted` entry additionally severs the walk above that
//! node once the node's own assignments are collected; descendants cannot
//! reopen a sever.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assignment::PortletAssignment;
use crate::constants::CONTEXT_CATEGORY;
use crate::context::{AdaptableContext, PortletContext};
use crate::local::{LocalAssignmentRegistry, TriState};
use crate::storage::{ManagerKind, PortletManager, StorageKey};

// ---------------------------------------------------------------------------
// Retrieved assignments
// ---------------------------------------------------------------------------

/// One resolved portlet: the assignment plus where it came from.  Together
/// with the slot name, category, key, and name identify the portlet stably
/// across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedAssignment {
    pub category: String,
    pub key: String,
    pub name: String,
    pub assignment: PortletAssignment,
}

// ---------------------------------------------------------------------------
// Blacklist resolution
// ---------------------------------------------------------------------------

/// Outcome of the acquisition pass over blacklist entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BlacklistResolution {
    /// First non-`Unset` status per category, nearest node first.  Absent
    /// categories resolved to `Unset`.
    resolved: BTreeMap<String, TriState>,
    /// Whether the `context` status came from a strict ancestor rather
    /// than the viewed context itself.
    context_status_acquired: bool,
}

impl BlacklistResolution {
    fn status(&self, category: &str) -> TriState {
        self.resolved
            .get(category)
            .copied()
            .unwrap_or(TriState::Unset)
    }
}

// ---------------------------------------------------------------------------
// Retriever
// ---------------------------------------------------------------------------

/// Resolves the portlets of one slot against one context hierarchy.
#[derive(Debug, Clone)]
pub struct PortletRetriever<'a> {
    manager: &'a PortletManager,
    locals: &'a LocalAssignmentRegistry,
}

impl<'a> PortletRetriever<'a> {
    pub fn new(manager: &'a PortletManager, locals: &'a LocalAssignmentRegistry) -> Self {
        Self { manager, locals }
    }

    /// Ordered assignments for `context`, per the slot's retrieval kind.
    pub fn get_portlets(&self, context: &dyn AdaptableContext) -> Vec<RetrievedAssignment> {
        match self.manager.kind() {
            ManagerKind::Placeful => self.placeful_portlets(context),
            ManagerKind::Placeless => self.placeless_portlets(context),
        }
    }

    fn placeful_portlets(&self, context: &dyn AdaptableContext) -> Vec<RetrievedAssignment> {
        let Some(origin) = context.portlet_context() else {
            tracing::debug!(
                slot = self.manager.name(),
                "context takes no part in portlet handling"
            );
            return Vec::new();
        };
        let categories = origin.global_portlet_categories(false);
        let resolution = self.resolve_blacklists(origin, &categories);
        let mut portlets = self.contextual_portlets(origin, &resolution);
        self.append_category_portlets(&categories, Some(&resolution), &mut portlets);
        portlets
    }

    fn placeless_portlets(&self, context: &dyn AdaptableContext) -> Vec<RetrievedAssignment> {
        let Some(origin) = context.portlet_context() else {
            tracing::debug!(
                slot = self.manager.name(),
                "context takes no part in portlet handling"
            );
            return Vec::new();
        };
        // No hierarchy walk and no blacklist filtering for placeless slots.
        let categories = origin.global_portlet_categories(true);
        let mut portlets = Vec::new();
        self.append_category_portlets(&categories, None, &mut portlets);
        portlets
    }

    /// Nearest-wins acquisition of blacklist entries over the parent chain.
    /// Needed categories: every distinct global category plus `context`.
    /// A status found closer to the origin is final; later ancestors cannot
    /// override it, and the walk stops early once everything is resolved.
    fn resolve_blacklists(
        &self,
        origin: &dyn PortletContext,
        categories: &[(String, String)],
    ) -> BlacklistResolution {
        let mut needed: Vec<&str> = vec![CONTEXT_CATEGORY];
        for (category, _) in categories {
            if !needed.contains(&category.as_str()) {
                needed.push(category.as_str());
            }
        }

        let mut resolution = BlacklistResolution::default();
        let mut node: Option<&dyn PortletContext> = Some(origin);
        let mut is_origin = true;
        while let Some(ctx) = node {
            if resolution.resolved.len() == needed.len() {
                break;
            }
            if ctx.supports_local_assignments()
                && let Some(local) = self.locals.get(ctx.uid(), self.manager.name())
            {
                for category in &needed {
                    if resolution.resolved.contains_key(*category) {
                        continue;
                    }
                    let status = local.blacklist_status(category);
                    if status != TriState::Unset {
                        resolution.resolved.insert((*category).to_string(), status);
                        if *category == CONTEXT_CATEGORY && !is_origin {
                            resolution.context_status_acquired = true;
                        }
                    }
                }
            }
            node = ctx.parent().and_then(|parent| parent.portlet_context());
            is_origin = false;
        }
        resolution
    }

    /// Contextual walk from the origin upward, nearest node first.
    fn contextual_portlets(
        &self,
        origin: &dyn PortletContext,
        resolution: &BlacklistResolution,
    ) -> Vec<RetrievedAssignment> {
        let mut portlets = Vec::new();
        if resolution.status(CONTEXT_CATEGORY) == TriState::Blacklisted
            && resolution.context_status_acquired
        {
            // Blackout acquired from an ancestor: nothing contextual shows,
            // the origin's own assignments included.
            return portlets;
        }
        let mut node: Option<&dyn PortletContext> = Some(origin);
        while let Some(ctx) = node {
            if ctx.supports_local_assignments()
                && let Some(local) = self.locals.get(ctx.uid(), self.manager.name())
            {
                for assignment in local.assignments().iter() {
                    portlets.push(RetrievedAssignment {
                        category: CONTEXT_CATEGORY.to_string(),
                        key: ctx.uid().to_string(),
                        name: assignment.name.clone(),
                        assignment: assignment.clone(),
                    });
                }
                if local.blacklist_status(CONTEXT_CATEGORY) == TriState::Blacklisted {
                    // The node severs inheritance above itself; its own
                    // assignments were already taken.
                    break;
                }
            }
            node = ctx.parent().and_then(|parent| parent.portlet_context());
        }
        portlets
    }

    /// Global pass: every non-blacklisted (category, key) pair in
    /// enumeration order, each store in display order.
    fn append_category_portlets(
        &self,
        categories: &[(String, String)],
        resolution: Option<&BlacklistResolution>,
        portlets: &mut Vec<RetrievedAssignment>,
    ) {
        for (category, key) in categories {
            if let Some(resolution) = resolution
                && resolution.status(category) == TriState::Blacklisted
            {
                continue;
            }
            let storage_key = StorageKey::from_text(key);
            let Some(store) = self.manager.store(category, &storage_key) else {
                continue;
            };
            for assignment in store.iter() {
                portlets.push(RetrievedAssignment {
                    category: category.clone(),
                    key: key.clone(),
                    name: assignment.name.clone(),
                    assignment: assignment.clone(),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::PortletAssignment;
    use crate::constants::{GLOBAL_CATEGORY, GLOBAL_CATEGORY_KEY, USER_CATEGORY};
    use crate::context::{OpaqueContext, StaticContext};
    use serde_json::json;

    // -- helpers ------------------------------------------------------------

    fn asg(label: &str) -> PortletAssignment {
        PortletAssignment::new("new", json!({ "label": label }))
    }

    fn labels(portlets: &[RetrievedAssignment]) -> Vec<String> {
        portlets
            .iter()
            .map(|portlet| portlet.assignment.data["label"].as_str().unwrap().to_string())
            .collect()
    }

    fn save_local(locals: &mut LocalAssignmentRegistry, uid: &str, slot: &str, label: &str) {
        locals
            .for_context(uid, slot)
            .assignments_mut()
            .save(asg(label));
    }

    // -- placeful basics ----------------------------------------------------

    #[test]
    fn contextual_before_global() {
        let mut manager = PortletManager::new("sidebar", ManagerKind::Placeful);
        manager.save_assignment(
            GLOBAL_CATEGORY,
            &StorageKey::from_text(GLOBAL_CATEGORY_KEY),
            asg("site"),
        );
        let mut locals = LocalAssignmentRegistry::new();
        save_local(&mut locals, "page", "sidebar", "here");

        let page = StaticContext::new("page");
        let retriever = PortletRetriever::new(&manager, &locals);
        let portlets = retriever.get_portlets(&page);
        assert_eq!(labels(&portlets), ["here", "site"]);
        assert_eq!(portlets[0].category, CONTEXT_CATEGORY);
        assert_eq!(portlets[0].key, "page");
        assert_eq!(portlets[1].category, GLOBAL_CATEGORY);
        assert_eq!(portlets[1].key, GLOBAL_CATEGORY_KEY);
    }

    #[test]
    fn unadaptable_origin_resolves_empty() {
        let manager = PortletManager::new("sidebar", ManagerKind::Placeful);
        let locals = LocalAssignmentRegistry::new();
        let retriever = PortletRetriever::new(&manager, &locals);
        assert!(retriever.get_portlets(&OpaqueContext).is_empty());
    }

    #[test]
    fn nearest_context_assignments_come_first() {
        let mut locals = LocalAssignmentRegistry::new();
        save_local(&mut locals, "root", "sidebar", "far");
        save_local(&mut locals, "leaf", "sidebar", "near");
        let manager = PortletManager::new("sidebar", ManagerKind::Placeful);

        let root = StaticContext::new("root");
        let leaf = StaticContext::new("leaf").with_parent(&root);
        let retriever = PortletRetriever::new(&manager, &locals);
        assert_eq!(labels(&retriever.get_portlets(&leaf)), ["near", "far"]);
    }

    // -- placeless ----------------------------------------------------------

    #[test]
    fn placeless_ignores_hierarchy_and_blacklists() {
        let mut manager = PortletManager::new("dashboard", ManagerKind::Placeless);
        manager.save_assignment(USER_CATEGORY, &StorageKey::from_text("bob"), asg("mine"));
        let mut locals = LocalAssignmentRegistry::new();
        save_local(&mut locals, "page", "dashboard", "contextual");
        locals
            .for_context("page", "dashboard")
            .set_blacklist_status(USER_CATEGORY, TriState::Blacklisted);

        let page = StaticContext::new("page").with_user("bob");
        let retriever = PortletRetriever::new(&manager, &locals);
        let portlets = retriever.get_portlets(&page);
        assert_eq!(labels(&portlets), ["mine"]);
        assert_eq!(portlets[0].category, USER_CATEGORY);
    }
}
