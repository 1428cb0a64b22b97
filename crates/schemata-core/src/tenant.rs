//! Multi-tenant isolation primitives.
//!
//! Every catalog document belongs to exactly one tenant. The tenant is taken
//! from the caller's identity when the document is created and never changes
//! afterwards; searches are always filtered by the caller's tenant.
//!
//! # Example
//!
//! ```rust
//! use schemata_core::tenant::TenantId;
//!
//! let tenant = TenantId::new("acme-corp").unwrap();
//! assert_eq!(tenant.as_str(), "acme-corp");
//! assert_eq!(TenantId::default_tenant().as_str(), "__user__");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Tenant assigned to documents whose stored form carries no tenant, and to
/// callers that did not request one.
pub const DEFAULT_TENANT: &str = "__user__";

/// Maximum tenant length accepted from callers.
const MAX_TENANT_LEN: usize = 128;

/// A tenant identifier.
///
/// Tenant IDs must be non-empty, at most 128 characters, and free of control
/// characters. Beyond that they are opaque: the identity provider owns their
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID after validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant ID is invalid.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Creates a tenant ID without validation.
    ///
    /// Intended for values read back from storage, which were validated
    /// when first written.
    #[must_use]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the well-known default tenant.
    #[must_use]
    pub fn default_tenant() -> Self {
        Self(DEFAULT_TENANT.to_string())
    }

    /// Returns true if this is the default tenant.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_TENANT
    }

    /// Returns the tenant ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::InvalidId {
                message: "tenant ID cannot be empty".to_string(),
            });
        }

        if id.len() > MAX_TENANT_LEN {
            return Err(Error::InvalidId {
                message: format!(
                    "tenant ID '{id}' is too long (maximum {MAX_TENANT_LEN} characters)"
                ),
            });
        }

        if id.chars().any(char::is_control) {
            return Err(Error::InvalidId {
                message: "tenant ID cannot contain control characters".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::default_tenant()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_tenant_ids() {
        assert!(TenantId::new("acme-corp").is_ok());
        assert!(TenantId::new("__user__").is_ok());
        assert!(TenantId::new("global_tenant").is_ok());
        assert!(TenantId::new("a").is_ok());
    }

    #[test]
    fn invalid_tenant_ids() {
        assert!(TenantId::new("").is_err());
        assert!(TenantId::new("x".repeat(129)).is_err());
        assert!(TenantId::new("line\nbreak").is_err());
    }

    #[test]
    fn default_tenant_is_well_known() {
        let tenant = TenantId::default();
        assert!(tenant.is_default());
        assert_eq!(tenant.to_string(), DEFAULT_TENANT);
    }
}
