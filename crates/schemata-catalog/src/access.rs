//! Caller identity and access control.
//!
//! The identity provider is external; it hands the catalog a [`Caller`].
//! [`AccessControl`] turns that caller into a tenant plus access-group tokens
//! and decides whether the caller may see a stored document.
//!
//! Access tokens have the form `User:<name>`, `BERole:<backend role>` and
//! `Role:<role>`. Visibility is any-overlap: a caller sees a document when at
//! least one of its tokens appears in the document's access list.

use serde::{Deserialize, Serialize};

use schemata_core::TenantId;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};

const USER_PREFIX: &str = "User:";
const BACKEND_ROLE_PREFIX: &str = "BERole:";
const ROLE_PREFIX: &str = "Role:";

/// An authenticated end user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User name.
    pub name: String,
    /// Backend roles mapped from the identity provider.
    #[serde(default)]
    pub backend_roles: Vec<String>,
    /// Security roles.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Tenant the user asked to act in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_tenant: Option<String>,
}

impl User {
    /// Creates a user with no roles in the default tenant.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the requested tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.requested_tenant = Some(tenant.into());
        self
    }

    /// Adds a backend role.
    #[must_use]
    pub fn with_backend_role(mut self, role: impl Into<String>) -> Self {
        self.backend_roles.push(role.into());
        self
    }

    /// Adds a security role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// Who is making a catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// Internal caller with security disabled; sees everything in the
    /// default tenant.
    System,
    /// An end user.
    User(User),
}

impl Caller {
    /// Returns a short label for logging.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User(user) => &user.name,
        }
    }
}

impl From<User> for Caller {
    fn from(user: User) -> Self {
        Self::User(user)
    }
}

/// Tenant and access groups captured from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Tenant new documents are stored under.
    pub tenant: TenantId,
    /// Access tokens recorded on new documents.
    pub access: Vec<String>,
}

/// Access-control collaborator consumed by the catalog.
pub trait AccessControl: Send + Sync + 'static {
    /// Rejects callers that may not use the catalog at all.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `InvalidRequest` for unusable callers.
    fn validate_caller(&self, caller: &Caller) -> Result<()>;

    /// Returns the tenant and access groups recorded for the caller.
    fn identity_of(&self, caller: &Caller) -> CallerIdentity;

    /// Returns the access tokens a search must overlap. Empty means no
    /// access clause.
    fn search_access(&self, caller: &Caller) -> Vec<String>;

    /// Returns true if the caller may see a document with this tenant and
    /// access list.
    fn has_access(&self, caller: &Caller, tenant: &TenantId, access: &[String]) -> bool;

    /// Returns true if the caller may see documents' access lists.
    fn has_all_info_access(&self, caller: &Caller) -> bool;
}

/// Role-based access control driven by [`CatalogConfig`].
#[derive(Debug, Clone)]
pub struct RoleAccessControl {
    filter_by_backend_roles: bool,
    admin_role: String,
    default_tenant: TenantId,
}

impl RoleAccessControl {
    /// Creates access control from catalog configuration.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            filter_by_backend_roles: config.filter_by_backend_roles,
            admin_role: config.admin_role.clone(),
            default_tenant: TenantId::new_unchecked(config.default_tenant.clone()),
        }
    }

    fn tenant_of(&self, caller: &Caller) -> TenantId {
        match caller {
            Caller::User(User {
                requested_tenant: Some(tenant),
                ..
            }) => TenantId::new_unchecked(tenant.clone()),
            _ => self.default_tenant.clone(),
        }
    }

    fn is_admin(&self, user: &User) -> bool {
        user.roles.iter().any(|role| *role == self.admin_role)
    }
}

impl Default for RoleAccessControl {
    fn default() -> Self {
        Self::new(&CatalogConfig::default())
    }
}

/// Returns every access token held by a user.
#[must_use]
pub fn access_tokens(user: &User) -> Vec<String> {
    std::iter::once(format!("{USER_PREFIX}{}", user.name))
        .chain(
            user.backend_roles
                .iter()
                .map(|r| format!("{BACKEND_ROLE_PREFIX}{r}")),
        )
        .chain(user.roles.iter().map(|r| format!("{ROLE_PREFIX}{r}")))
        .collect()
}

impl AccessControl for RoleAccessControl {
    fn validate_caller(&self, caller: &Caller) -> Result<()> {
        let Caller::User(user) = caller else {
            return Ok(());
        };
        if let Some(tenant) = &user.requested_tenant {
            TenantId::new(tenant.clone()).map_err(CatalogError::from)?;
        }
        if self.tenant_of(caller).is_default() && user.name.trim().is_empty() {
            return Err(CatalogError::permission_denied(
                "user name not provided for private tenant access",
            ));
        }
        if self.filter_by_backend_roles && user.backend_roles.is_empty() {
            return Err(CatalogError::permission_denied(
                "user has no backend roles configured",
            ));
        }
        Ok(())
    }

    fn identity_of(&self, caller: &Caller) -> CallerIdentity {
        let access = match caller {
            Caller::System => Vec::new(),
            Caller::User(user) => access_tokens(user),
        };
        CallerIdentity {
            tenant: self.tenant_of(caller),
            access,
        }
    }

    fn search_access(&self, caller: &Caller) -> Vec<String> {
        match caller {
            Caller::System => Vec::new(),
            Caller::User(user) if self.is_admin(user) => Vec::new(),
            Caller::User(user) if self.filter_by_backend_roles => user
                .backend_roles
                .iter()
                .map(|r| format!("{BACKEND_ROLE_PREFIX}{r}"))
                .collect(),
            Caller::User(user) => vec![format!("{USER_PREFIX}{}", user.name)],
        }
    }

    fn has_access(&self, caller: &Caller, tenant: &TenantId, access: &[String]) -> bool {
        let Caller::User(user) = caller else {
            return true;
        };
        if self.tenant_of(caller) != *tenant {
            return false;
        }
        if self.is_admin(user) {
            return true;
        }
        access_tokens(user)
            .iter()
            .any(|token| access.contains(token))
    }

    fn has_all_info_access(&self, caller: &Caller) -> bool {
        match caller {
            Caller::System => true,
            Caller::User(user) => !self.filter_by_backend_roles || self.is_admin(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new("alice")
            .with_tenant("acme")
            .with_backend_role("eng")
            .with_role("reader")
    }

    #[test]
    fn tokens_cover_name_and_roles() {
        assert_eq!(
            access_tokens(&alice()),
            vec!["User:alice", "BERole:eng", "Role:reader"]
        );
    }

    #[test]
    fn identity_uses_requested_or_default_tenant() {
        let ac = RoleAccessControl::default();
        let identity = ac.identity_of(&alice().into());
        assert_eq!(identity.tenant.as_str(), "acme");
        assert_eq!(identity.access.len(), 3);

        let system = ac.identity_of(&Caller::System);
        assert!(system.tenant.is_default());
        assert!(system.access.is_empty());
    }

    #[test]
    fn access_is_any_overlap_within_tenant() {
        let ac = RoleAccessControl::default();
        let caller: Caller = alice().into();
        let acme = TenantId::new("acme").unwrap();
        let other = TenantId::new("globex").unwrap();

        assert!(ac.has_access(&caller, &acme, &["Role:reader".into(), "User:bob".into()]));
        assert!(!ac.has_access(&caller, &acme, &["User:bob".into()]));
        assert!(!ac.has_access(&caller, &other, &["User:alice".into()]));
        assert!(ac.has_access(&Caller::System, &other, &[]));
    }

    #[test]
    fn admin_bypasses_access_lists_but_not_tenants() {
        let ac = RoleAccessControl::default();
        let admin: Caller = User::new("root").with_tenant("acme").with_role("all_access").into();
        let acme = TenantId::new("acme").unwrap();
        let other = TenantId::new("globex").unwrap();

        assert!(ac.has_access(&admin, &acme, &["User:bob".into()]));
        assert!(!ac.has_access(&admin, &other, &[]));
        assert!(ac.search_access(&admin).is_empty());
    }

    #[test]
    fn backend_role_filtering_requires_roles() {
        let config = CatalogConfig {
            filter_by_backend_roles: true,
            ..CatalogConfig::default()
        };
        let ac = RoleAccessControl::new(&config);
        let no_roles: Caller = User::new("carol").with_tenant("acme").into();
        let err = ac.validate_caller(&no_roles).unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { .. }));

        let caller: Caller = alice().into();
        assert!(ac.validate_caller(&caller).is_ok());
        assert_eq!(ac.search_access(&caller), vec!["BERole:eng"]);
        assert!(!ac.has_all_info_access(&caller));
    }

    #[test]
    fn search_access_defaults_to_user_token() {
        let ac = RoleAccessControl::default();
        assert_eq!(ac.search_access(&alice().into()), vec!["User:alice"]);
        assert!(ac.search_access(&Caller::System).is_empty());
    }

    #[test]
    fn private_tenant_requires_a_name() {
        let ac = RoleAccessControl::default();
        let anonymous: Caller = User::new("").into();
        assert!(ac.validate_caller(&anonymous).is_err());
    }
}
