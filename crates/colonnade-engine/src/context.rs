//! Context traits: how the engine sees the surrounding content hierarchy.
//!
//! The engine never walks a concrete tree type.  An object that can hold or
//! inherit portlets exposes [`PortletContext`]; anything else answers `None`
//! from [`AdaptableContext::portlet_context`] and resolution treats it as
//! empty rather than failing.  Parents are re-adapted at every step, so a
//! hierarchy may mix concrete types freely.

use crate::constants::{
    CONTENT_TYPE_CATEGORY, GLOBAL_CATEGORY, GLOBAL_CATEGORY_KEY, GROUP_CATEGORY, USER_CATEGORY,
};
use std::fmt;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Entry point of the capability check.  `None` opts the object out of
/// portlet handling entirely.
pub trait AdaptableContext {
    fn portlet_context(&self) -> Option<&dyn PortletContext>;
}

/// Every full portlet context adapts to itself.
impl<T: PortletContext> AdaptableContext for T {
    fn portlet_context(&self) -> Option<&dyn PortletContext> {
        Some(self)
    }
}

/// A node of the content hierarchy as resolution sees it.
pub trait PortletContext {
    /// Stable identifier; keys the local assignment side-table.
    fn uid(&self) -> &str;

    /// Parent for acquisition walks.  `None` ends the chain.  Chains must
    /// be finite.
    fn parent(&self) -> Option<&dyn AdaptableContext>;

    /// Authenticated user id, if any.
    fn user_id(&self) -> Option<&str>;

    /// Group ids in enumeration order.
    fn group_ids(&self) -> &[String];

    /// Ordered (category, key) pairs of the non-contextual categories this
    /// context participates in.  Placeless retrieval passes `true` and
    /// conventionally gets the principal-bound subset.
    fn global_portlet_categories(&self, placeless: bool) -> Vec<(String, String)>;

    /// Whether this node may carry local assignments.  Nodes answering
    /// `false` are skipped by hierarchy walks, not chain-ending.
    fn supports_local_assignments(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Standard category enumeration
// ---------------------------------------------------------------------------

/// The conventional category list: user, groups, content type, site-wide.
/// Placeless slots keep only the principal-bound part.
pub fn standard_global_categories(
    user_id: Option<&str>,
    group_ids: &[String],
    content_type: Option<&str>,
    placeless: bool,
) -> Vec<(String, String)> {
    let mut categories = Vec::new();
    if let Some(user) = user_id {
        categories.push((USER_CATEGORY.to_string(), user.to_string()));
    }
    for group in group_ids {
        categories.push((GROUP_CATEGORY.to_string(), group.clone()));
    }
    if !placeless {
        if let Some(content_type) = content_type {
            categories.push((CONTENT_TYPE_CATEGORY.to_string(), content_type.to_string()));
        }
        categories.push((GLOBAL_CATEGORY.to_string(), GLOBAL_CATEGORY_KEY.to_string()));
    }
    categories
}

// ---------------------------------------------------------------------------
// In-memory contexts
// ---------------------------------------------------------------------------

/// In-memory [`PortletContext`] for tests and embedders with static trees.
/// Parents are plain references, so a hierarchy is built root first.
#[derive(Clone)]
pub struct StaticContext<'a> {
    uid: String,
    parent: Option<&'a dyn AdaptableContext>,
    user_id: Option<String>,
    group_ids: Vec<String>,
    content_type: Option<String>,
    supports_local: bool,
}

impl<'a> StaticContext<'a> {
    pub fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            parent: None,
            user_id: None,
            group_ids: Vec::new(),
            content_type: None,
            supports_local: true,
        }
    }

    pub fn with_parent(mut self, parent: &'a dyn AdaptableContext) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_groups(mut self, group_ids: &[&str]) -> Self {
        self.group_ids = group_ids.iter().map(|group| group.to_string()).collect();
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn without_local_assignments(mut self) -> Self {
        self.supports_local = false;
        self
    }
}

impl fmt::Debug for StaticContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticContext")
            .field("uid", &self.uid)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl PortletContext for StaticContext<'_> {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn parent(&self) -> Option<&dyn AdaptableContext> {
        self.parent
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn group_ids(&self) -> &[String] {
        &self.group_ids
    }

    fn global_portlet_categories(&self, placeless: bool) -> Vec<(String, String)> {
        standard_global_categories(
            self.user_id.as_deref(),
            &self.group_ids,
            self.content_type.as_deref(),
            placeless,
        )
    }

    fn supports_local_assignments(&self) -> bool {
        self.supports_local
    }
}

/// Object that takes no part in portlet handling.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueContext;

impl AdaptableContext for OpaqueContext {
    fn portlet_context(&self) -> Option<&dyn PortletContext> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- adaptation ---------------------------------------------------------

    #[test]
    fn portlet_contexts_adapt_to_themselves() {
        let context = StaticContext::new("page-1");
        let adaptable: &dyn AdaptableContext = &context;
        assert_eq!(adaptable.portlet_context().unwrap().uid(), "page-1");
    }

    #[test]
    fn opaque_objects_do_not_adapt() {
        let opaque = OpaqueContext;
        assert!(opaque.portlet_context().is_none());
    }

    // -- hierarchy ----------------------------------------------------------

    #[test]
    fn parent_chain_walks_and_readapts() {
        let root = StaticContext::new("root");
        let middle = StaticContext::new("middle").with_parent(&root);
        let leaf = StaticContext::new("leaf").with_parent(&middle);

        let mut uids = Vec::new();
        let mut node: Option<&dyn PortletContext> = Some(&leaf);
        while let Some(ctx) = node {
            uids.push(ctx.uid().to_string());
            node = ctx.parent().and_then(|parent| parent.portlet_context());
        }
        assert_eq!(uids, ["leaf", "middle", "root"]);
    }

    #[test]
    fn opaque_parent_ends_the_chain() {
        let opaque = OpaqueContext;
        let leaf = StaticContext::new("leaf").with_parent(&opaque);
        assert!(
            leaf.parent()
                .and_then(|parent| parent.portlet_context())
                .is_none()
        );
    }

    #[test]
    fn local_assignment_support_is_opt_out() {
        let context = StaticContext::new("page-1");
        assert!(context.supports_local_assignments());
        let bare = StaticContext::new("page-2").without_local_assignments();
        assert!(!bare.supports_local_assignments());
    }

    // -- category enumeration -----------------------------------------------

    #[test]
    fn standard_categories_in_order() {
        let groups = vec!["g1".to_string(), "g2".to_string()];
        let categories = standard_global_categories(Some("bob"), &groups, Some("document"), false);
        assert_eq!(
            categories,
            vec![
                ("user".to_string(), "bob".to_string()),
                ("group".to_string(), "g1".to_string()),
                ("group".to_string(), "g2".to_string()),
                ("content_type".to_string(), "document".to_string()),
                ("global".to_string(), "global".to_string()),
            ]
        );
    }

    #[test]
    fn placeless_enumeration_is_principal_bound() {
        let groups = vec!["g1".to_string()];
        let categories = standard_global_categories(Some("bob"), &groups, Some("document"), true);
        assert_eq!(
            categories,
            vec![
                ("user".to_string(), "bob".to_string()),
                ("group".to_string(), "g1".to_string()),
            ]
        );
    }

    #[test]
    fn anonymous_context_has_no_user_pair() {
        let categories = standard_global_categories(None, &[], None, false);
        assert_eq!(
            categories,
            vec![("global".to_string(), "global".to_string())]
        );
    }
}
