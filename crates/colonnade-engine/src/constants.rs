//! Well-known category names.
//!
//! Categories partition a slot's global storage by the kind of key that
//! selects a store: a user id, a group id, a content type name, or the
//! single site-wide key.  The `context` pseudo-category never appears in
//! global storage; it tags assignments collected from the hierarchy walk
//! and keys their blacklist entries.

/// Per-user assignments, keyed by user id.
pub const USER_CATEGORY: &str = "user";

/// Per-group assignments, keyed by group id.
pub const GROUP_CATEGORY: &str = "group";

/// Per-content-type assignments, keyed by type name.
pub const CONTENT_TYPE_CATEGORY: &str = "content_type";

/// Site-wide assignments.
pub const GLOBAL_CATEGORY: &str = "global";

/// The single key used inside [`GLOBAL_CATEGORY`].
pub const GLOBAL_CATEGORY_KEY: &str = "global";

/// Pseudo-category of assignments acquired from the context hierarchy.
pub const CONTEXT_CATEGORY: &str = "context";
