//! Domain compilation: reference validation plus registration.
//!
//! Compilation is all-or-nothing up to the registry insert. It does not
//! persist the owning document; the caller does that afterwards, and a
//! failed persist leaves the registered domain in place.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::access::{AccessControl, Caller};
use crate::domain::registry::DomainRegistry;
use crate::domain::resource::DomainResource;
use crate::error::{CatalogError, Result};
use crate::index::CatalogIndex;

/// Validates domain references and registers compiled domains.
#[derive(Clone, Copy)]
pub struct DomainCompiler<'a> {
    index: &'a CatalogIndex,
    registry: &'a DomainRegistry,
    access: &'a dyn AccessControl,
}

impl<'a> DomainCompiler<'a> {
    /// Creates a compiler over the given collaborators.
    #[must_use]
    pub fn new(
        index: &'a CatalogIndex,
        registry: &'a DomainRegistry,
        access: &'a dyn AccessControl,
    ) -> Self {
        Self {
            index,
            registry,
            access,
        }
    }

    /// Compiles and registers a domain.
    ///
    /// 1. Rejects a name that is already registered.
    /// 2. Fetches every referenced id in one multi-get.
    /// 3. Fails with exactly the ids that did not resolve.
    /// 4. Checks the caller may see every referenced document.
    /// 5. Inserts the resource if the name is still free.
    ///
    /// # Errors
    ///
    /// `DuplicateName`, `MissingReferences`, `PermissionDenied`, or a store
    /// failure. On any error the registry is unchanged.
    pub async fn compile(
        &self,
        name: &str,
        referenced: &[String],
        caller: &Caller,
    ) -> Result<Arc<DomainResource>> {
        if self.registry.contains(name)? {
            return Err(CatalogError::DuplicateName {
                name: name.to_string(),
            });
        }

        let unique: Vec<String> = referenced
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        let fetched = if unique.is_empty() {
            Vec::new()
        } else {
            self.index.multi_get(&unique).await?
        };

        let found: BTreeSet<&str> = fetched.iter().map(|doc| doc.id.as_str()).collect();
        let missing: BTreeSet<String> = unique
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            tracing::warn!(domain = name, missing = ?missing, "domain references unresolved ids");
            return Err(CatalogError::MissingReferences { missing });
        }

        if let Some(denied) = fetched
            .iter()
            .find(|doc| !self.access.has_access(caller, &doc.tenant, &doc.access))
        {
            return Err(CatalogError::permission_denied(format!(
                "no access to referenced object {}",
                denied.id
            )));
        }

        let resource = self
            .registry
            .insert_if_absent(DomainResource::new(name, referenced.to_vec()))?;
        tracing::info!(
            domain = name,
            entities = resource.entities().len(),
            "domain registered"
        );
        Ok(resource)
    }
}
