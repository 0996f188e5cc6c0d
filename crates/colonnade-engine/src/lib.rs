//! Portlet placement and resolution engine.
//!
//! Decides which portlets appear in a named slot for a given viewing
//! context.  Assignments live in two places: per-slot global storage
//! partitioned by category (`user`, `group`, `content_type`, `global`) and
//! per-context local stores held in an explicit side-table.  Resolution
//! walks the context hierarchy iteratively, acquires tri-state blacklist
//! entries with nearest-ancestor-wins, and yields a deterministic ordered
//! assignment list.  [`ManagerRenderer`] then drives the update/render
//! protocol over the result with per-portlet failure isolation.
//!
//! The engine is synchronous and request-scoped.  Nothing here locks or
//! suspends; mutation ordering belongs to the surrounding transaction
//! discipline, and write conflicts surface as the conflict error class for
//! the caller to retry.

#![forbid(unsafe_code)]

pub mod assignment;
pub mod constants;
pub mod context;
pub mod identity;
pub mod local;
pub mod manager;
pub mod registration;
pub mod retriever;
pub mod storage;

pub use assignment::{AssignmentSettings, AssignmentStore, PortletAssignment, StoreError, StoreRef};
pub use context::{
    AdaptableContext, OpaqueContext, PortletContext, StaticContext, standard_global_categories,
};
pub use identity::{
    IdentityError, PortletMetadata, hash_portlet_metadata, unhash_portlet_metadata,
};
pub use local::{LocalAssignmentManager, LocalAssignmentRegistry, TriState};
pub use manager::{
    ManagerError, ManagerRenderer, PortletRenderer, RenderError, RenderedPortlet, RendererFactory,
    RendererOptions, RendererState, SlotTemplate,
};
pub use registration::{PortletType, PortletTypeRegistry, RegistrationError};
pub use retriever::{PortletRetriever, RetrievedAssignment};
pub use storage::{CategoryMapping, ManagerKind, PortletManager, StorageKey};
