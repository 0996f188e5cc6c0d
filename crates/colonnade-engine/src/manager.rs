//! Slot rendering protocol.
//!
//! [`ManagerRenderer`] drives one slot for one request: resolve the
//! assignments once, adapt each to a renderer, then run the update/render
//! protocol over the survivors.  One broken portlet degrades to a fallback
//! message; a conflict-class failure aborts the whole render so the
//! surrounding transaction machinery can retry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::AdaptableContext;
use crate::identity::PortletMetadata;
use crate::local::LocalAssignmentRegistry;
use crate::retriever::{PortletRetriever, RetrievedAssignment};
use crate::storage::PortletManager;

// ---------------------------------------------------------------------------
// Renderer protocol traits
// ---------------------------------------------------------------------------

/// Per-portlet rendering adapter produced from an assignment's payload.
pub trait PortletRenderer {
    /// Identity stamp.  Called once, before availability is read, so
    /// availability may depend on where the portlet is placed.
    fn set_metadata(&mut self, _metadata: &PortletMetadata) {}

    /// Renderer-level availability gate; unavailable portlets are dropped
    /// from the shown list before the update phase.
    fn available(&self) -> bool {
        true
    }

    /// Pre-render hook, run once per request on every shown portlet.
    fn update(&mut self);

    /// Produce the portlet markup.
    fn render(&self) -> Result<String, RenderError>;
}

/// Builds renderers from resolved assignments.  `None` skips the portlet:
/// an assignment nothing can render is dropped rather than failing the
/// slot.
pub trait RendererFactory {
    fn data_to_portlet(&self, retrieved: &RetrievedAssignment) -> Option<Box<dyn PortletRenderer>>;
}

/// Whole-slot template override.  Receives every rendered portlet in
/// display order instead of the default newline join.
pub trait SlotTemplate {
    fn render_slot(&self, portlets: &[RenderedPortlet]) -> String;
}

/// A portlet's markup with its identity, as handed to slot templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPortlet {
    pub metadata: PortletMetadata,
    pub markup: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure from one portlet's render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderError {
    /// Transaction-conflict class; aborts the slot so the caller can
    /// retry the whole request.
    Conflict { detail: String },
    /// Any other rendering failure; replaced by the slot's fallback text.
    Failed { detail: String },
}

impl RenderError {
    /// Stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Conflict { .. } => "RENDER_CONFLICT",
            Self::Failed { .. } => "RENDER_FAILED",
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { detail } => write!(f, "conflicting concurrent change: {detail}"),
            Self::Failed { detail } => write!(f, "portlet rendering failed: {detail}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Slot protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerError {
    /// `render` was called before `update`.
    UpdateNotCalled,
    /// A portlet raised the conflict class during render.
    Conflict { detail: String },
}

impl ManagerError {
    /// Stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UpdateNotCalled => "MANAGER_UPDATE_NOT_CALLED",
            Self::Conflict { .. } => "MANAGER_CONFLICT",
        }
    }
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateNotCalled => write!(f, "render() called before update()"),
            Self::Conflict { detail } => write!(f, "conflicting concurrent change: {detail}"),
        }
    }
}

impl std::error::Error for ManagerError {}

// ---------------------------------------------------------------------------
// Renderer state and options
// ---------------------------------------------------------------------------

/// Protocol state of a [`ManagerRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererState {
    Created,
    Updated,
    Rendered,
}

impl RendererState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Rendered => "rendered",
        }
    }
}

impl fmt::Display for RendererState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables of one slot rendering pass.
#[derive(Debug, Clone)]
pub struct RendererOptions {
    /// Markup substituted for a portlet whose render fails.
    pub error_message: String,
    /// Assignment-level filter applied before adaptation.
    pub filter: fn(&RetrievedAssignment) -> bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            error_message: "This portlet could not be rendered.".to_string(),
            filter: |retrieved| retrieved.assignment.available,
        }
    }
}

// ---------------------------------------------------------------------------
// Manager renderer
// ---------------------------------------------------------------------------

struct PreparedPortlet {
    metadata: PortletMetadata,
    renderer: Box<dyn PortletRenderer>,
}

/// Drives the render protocol of one slot for one context.  Single-use:
/// construct per request, `update`, then `render`.
///
/// The portlet list is loaded at most once per instance and the instance
/// is bound to its (context, slot) pair by construction, so two slots on
/// one page never share a cache.
pub struct ManagerRenderer<'a> {
    context: &'a dyn AdaptableContext,
    manager: &'a PortletManager,
    locals: &'a LocalAssignmentRegistry,
    factory: &'a dyn RendererFactory,
    template: Option<&'a dyn SlotTemplate>,
    options: RendererOptions,
    state: RendererState,
    prepared: Option<Vec<PreparedPortlet>>,
}

impl fmt::Debug for ManagerRenderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerRenderer")
            .field("slot", &self.manager.name())
            .field("state", &self.state)
            .field("loaded", &self.prepared.is_some())
            .finish()
    }
}

impl<'a> ManagerRenderer<'a> {
    pub fn new(
        context: &'a dyn AdaptableContext,
        manager: &'a PortletManager,
        locals: &'a LocalAssignmentRegistry,
        factory: &'a dyn RendererFactory,
    ) -> Self {
        Self {
            context,
            manager,
            locals,
            factory,
            template: None,
            options: RendererOptions::default(),
            state: RendererState::Created,
            prepared: None,
        }
    }

    pub fn with_options(mut self, options: RendererOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_template(mut self, template: &'a dyn SlotTemplate) -> Self {
        self.template = Some(template);
        self
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Whether the slot has anything to show.  Loads the portlets if
    /// needed.
    pub fn visible(&mut self) -> bool {
        !self.load_portlets().is_empty()
    }

    /// Identity of every shown portlet in display order.
    pub fn shown_metadata(&mut self) -> Vec<PortletMetadata> {
        self.load_portlets()
            .iter()
            .map(|portlet| portlet.metadata.clone())
            .collect()
    }

    /// Run the update phase over every shown portlet.  A second call is a
    /// no-op.
    pub fn update(&mut self) {
        if self.state != RendererState::Created {
            return;
        }
        for portlet in self.load_portlets().iter_mut() {
            portlet.renderer.update();
        }
        self.state = RendererState::Updated;
    }

    /// Render every shown portlet and join the results with newlines, or
    /// delegate to the slot template when one is set.  Must come after
    /// [`update`](Self::update).
    pub fn render(&mut self) -> Result<String, ManagerError> {
        if self.state == RendererState::Created {
            return Err(ManagerError::UpdateNotCalled);
        }
        let portlets = self.prepared.as_deref().unwrap_or(&[]);
        let mut rendered = Vec::with_capacity(portlets.len());
        for portlet in portlets {
            let markup = match portlet.renderer.render() {
                Ok(markup) => markup,
                Err(RenderError::Conflict { detail }) => {
                    return Err(ManagerError::Conflict { detail });
                }
                Err(error) => {
                    tracing::error!(
                        slot = self.manager.name(),
                        category = %portlet.metadata.category,
                        key = %portlet.metadata.key,
                        name = %portlet.metadata.name,
                        error = %error,
                        "portlet rendering failed; substituting error message"
                    );
                    self.options.error_message.clone()
                }
            };
            rendered.push(RenderedPortlet {
                metadata: portlet.metadata.clone(),
                markup,
            });
        }
        self.state = RendererState::Rendered;
        match self.template {
            Some(template) => Ok(template.render_slot(&rendered)),
            None => Ok(rendered
                .iter()
                .map(|portlet| portlet.markup.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn load_portlets(&mut self) -> &mut Vec<PreparedPortlet> {
        if self.prepared.is_none() {
            let prepared = self.build_portlets();
            self.prepared = Some(prepared);
        }
        self.prepared.get_or_insert_with(Vec::new)
    }

    fn build_portlets(&self) -> Vec<PreparedPortlet> {
        let retriever = PortletRetriever::new(self.manager, self.locals);
        let mut prepared = Vec::new();
        for retrieved in retriever.get_portlets(self.context) {
            if !(self.options.filter)(&retrieved) {
                continue;
            }
            let Some(mut renderer) = self.factory.data_to_portlet(&retrieved) else {
                tracing::debug!(
                    slot = self.manager.name(),
                    category = %retrieved.category,
                    key = %retrieved.key,
                    name = %retrieved.name,
                    "no renderer for assignment; skipping"
                );
                continue;
            };
            let metadata = PortletMetadata {
                manager: self.manager.name().to_string(),
                category: retrieved.category,
                key: retrieved.key,
                name: retrieved.name,
            };
            // Metadata goes on first, so availability may consult it.
            renderer.set_metadata(&metadata);
            if !renderer.available() {
                continue;
            }
            prepared.push(PreparedPortlet { metadata, renderer });
        }
        prepared
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
