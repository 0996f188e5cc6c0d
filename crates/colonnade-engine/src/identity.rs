//! Stable reversible portlet identity.
//!
//! A resolved portlet is identified by slot, category, key, and name.  The
//! hash flattens those four fields into a hex token safe for element ids
//! and cache keys; [`unhash_portlet_metadata`] restores the fields exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Identity of one resolved portlet within one slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortletMetadata {
    /// Slot (portlet manager) name.
    pub manager: String,
    pub category: String,
    pub key: String,
    pub name: String,
}

impl PortletMetadata {
    pub fn new(manager: &str, category: &str, key: &str, name: &str) -> Self {
        Self {
            manager: manager.to_string(),
            category: category.to_string(),
            key: key.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for PortletMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.manager, self.category, self.key, self.name
        )
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to reverse a portlet hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityError {
    /// Token is not well-formed hex.
    MalformedHex { detail: String },
    /// Hex decoded, but the payload is not a metadata tuple.
    MalformedPayload { detail: String },
}

impl IdentityError {
    /// Stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedHex { .. } => "IDENTITY_MALFORMED_HEX",
            Self::MalformedPayload { .. } => "IDENTITY_MALFORMED_PAYLOAD",
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHex { detail } => {
                write!(f, "portlet hash is not valid hex: {detail}")
            }
            Self::MalformedPayload { detail } => {
                write!(f, "portlet hash payload is malformed: {detail}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Hex token for `manager\ncategory\nkey\nname`.
pub fn hash_portlet_metadata(metadata: &PortletMetadata) -> String {
    let joined = format!(
        "{}\n{}\n{}\n{}",
        metadata.manager, metadata.category, metadata.key, metadata.name
    );
    joined.bytes().map(|byte| format!("{byte:02x}")).collect()
}

/// Reverse of [`hash_portlet_metadata`].
pub fn unhash_portlet_metadata(token: &str) -> Result<PortletMetadata, IdentityError> {
    let digits = token
        .chars()
        .map(|c| {
            c.to_digit(16).ok_or_else(|| IdentityError::MalformedHex {
                detail: format!("invalid digit `{c}`"),
            })
        })
        .collect::<Result<Vec<u32>, _>>()?;
    if digits.len() % 2 != 0 {
        return Err(IdentityError::MalformedHex {
            detail: "odd length".to_string(),
        });
    }
    let bytes: Vec<u8> = digits
        .chunks(2)
        .map(|pair| (pair[0] * 16 + pair[1]) as u8)
        .collect();
    let joined = String::from_utf8(bytes).map_err(|_| IdentityError::MalformedPayload {
        detail: "not valid utf-8".to_string(),
    })?;
    let fields: Vec<&str> = joined.split('\n').collect();
    let &[manager, category, key, name] = fields.as_slice() else {
        return Err(IdentityError::MalformedPayload {
            detail: format!("expected 4 fields, found {}", fields.len()),
        });
    };
    Ok(PortletMetadata::new(manager, category, key, name))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
