//! Portlet type registry.
//!
//! Site-scoped catalogue of the portlet types that may be added through
//! management screens.  The registry is an explicit owned object rather
//! than process-global state: the embedding application constructs one per
//! site scope and passes it where needed, so setup and teardown are plain
//! construction and drop.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::PortletManager;

// ---------------------------------------------------------------------------
// Portlet type records
// ---------------------------------------------------------------------------

/// Descriptor of an addable portlet type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortletType {
    pub title: String,
    pub description: String,
    /// Identifier of the add view; unique per registry.
    pub addview: String,
    /// Marker feature a slot must carry for this type to be addable there.
    /// `None` means addable everywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<String>,
}

impl PortletType {
    pub fn new(title: &str, description: &str, addview: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            addview: addview.to_string(),
            applies_to: None,
        }
    }

    pub fn applies_to(mut self, feature: &str) -> Self {
        self.applies_to = Some(feature.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Registration error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RegistrationError {
    #[error("portlet type `{addview}` is already registered")]
    DuplicateAddview { addview: String },
    #[error("portlet type `{addview}` is not registered")]
    UnknownAddview { addview: String },
}

impl RegistrationError {
    /// Stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateAddview { .. } => "REGISTRATION_DUPLICATE_ADDVIEW",
            Self::UnknownAddview { .. } => "REGISTRATION_UNKNOWN_ADDVIEW",
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Portlet type catalogue keyed by add view identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortletTypeRegistry {
    types: BTreeMap<String, PortletType>,
}

impl PortletTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, portlet_type: PortletType) -> Result<(), RegistrationError> {
        if self.types.contains_key(&portlet_type.addview) {
            return Err(RegistrationError::DuplicateAddview {
                addview: portlet_type.addview.clone(),
            });
        }
        self.types
            .insert(portlet_type.addview.clone(), portlet_type);
        Ok(())
    }

    pub fn unregister(&mut self, addview: &str) -> Result<PortletType, RegistrationError> {
        self.types
            .remove(addview)
            .ok_or_else(|| RegistrationError::UnknownAddview {
                addview: addview.to_string(),
            })
    }

    pub fn get(&self, addview: &str) -> Option<&PortletType> {
        self.types.get(addview)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered types in add view order.
    pub fn iter(&self) -> impl Iterator<Item = &PortletType> {
        self.types.values()
    }

    /// Types addable to `manager`: unconstrained types plus those whose
    /// marker feature the slot carries.
    pub fn addable_portlet_types(&self, manager: &PortletManager) -> Vec<&PortletType> {
        self.types
            .values()
            .filter(|portlet_type| {
                portlet_type
                    .applies_to
                    .as_deref()
                    .is_none_or(|marker| manager.has_feature(marker))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ManagerKind;

    fn calendar() -> PortletType {
        PortletType::new("Calendar", "Upcoming events", "portlets.calendar")
    }

    // -- register / unregister ----------------------------------------------

    #[test]
    fn register_and_get() {
        let mut registry = PortletTypeRegistry::new();
        registry.register(calendar()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("portlets.calendar").unwrap().title, "Calendar");
    }

    #[test]
    fn duplicate_addview_is_rejected() {
        let mut registry = PortletTypeRegistry::new();
        registry.register(calendar()).unwrap();
        let err = registry.register(calendar()).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateAddview { .. }));
        assert_eq!(err.error_code(), "REGISTRATION_DUPLICATE_ADDVIEW");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_returns_the_record() {
        let mut registry = PortletTypeRegistry::new();
        registry.register(calendar()).unwrap();
        let removed = registry.unregister("portlets.calendar").unwrap();
        assert_eq!(removed.addview, "portlets.calendar");
        assert!(registry.is_empty());

        let err = registry.unregister("portlets.calendar").unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownAddview { .. }));
        assert_eq!(
            err.to_string(),
            "portlet type `portlets.calendar` is not registered"
        );
    }

    // -- addable filtering --------------------------------------------------

    #[test]
    fn addable_types_honor_applies_to() {
        let mut registry = PortletTypeRegistry::new();
        registry.register(calendar()).unwrap();
        registry
            .register(
                PortletType::new("Review queue", "Items to review", "portlets.review")
                    .applies_to("dashboard"),
            )
            .unwrap();

        let mut dashboard = PortletManager::new("dashboard-left", ManagerKind::Placeless);
        dashboard.add_feature("dashboard");
        let sidebar = PortletManager::new("sidebar", ManagerKind::Placeful);

        let addable: Vec<&str> = registry
            .addable_portlet_types(&dashboard)
            .iter()
            .map(|portlet_type| portlet_type.addview.as_str())
            .collect();
        assert_eq!(addable, ["portlets.calendar", "portlets.review"]);

        let addable: Vec<&str> = registry
            .addable_portlet_types(&sidebar)
            .iter()
            .map(|portlet_type| portlet_type.addview.as_str())
            .collect();
        assert_eq!(addable, ["portlets.calendar"]);
    }
}
