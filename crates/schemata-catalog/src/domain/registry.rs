//! Process-wide registry of compiled domains.
//!
//! Each name is either absent or present; once present it stays present for
//! the life of the process. The only write is [`DomainRegistry::insert_if_absent`],
//! so concurrent compilations of the same name resolve to exactly one winner.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::domain::resource::DomainResource;
use crate::error::{CatalogError, Result};

static GLOBAL: OnceLock<Arc<DomainRegistry>> = OnceLock::new();

/// Concurrent map from domain name to compiled resource.
#[derive(Debug, Default)]
pub struct DomainRegistry {
    domains: RwLock<HashMap<String, Arc<DomainResource>>>,
}

impl DomainRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Inserts a resource unless its name is already registered.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if the name is taken, `Internal` if the lock
    /// is poisoned.
    pub fn insert_if_absent(&self, resource: DomainResource) -> Result<Arc<DomainResource>> {
        let mut domains = self
            .domains
            .write()
            .map_err(|_| CatalogError::internal("domain registry lock poisoned"))?;
        if domains.contains_key(resource.name()) {
            return Err(CatalogError::DuplicateName {
                name: resource.name().to_string(),
            });
        }
        let resource = Arc::new(resource);
        domains.insert(resource.name().to_string(), Arc::clone(&resource));
        drop(domains);
        Ok(resource)
    }

    /// Returns the resource registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the lock is poisoned.
    pub fn get(&self, name: &str) -> Result<Option<Arc<DomainResource>>> {
        let domains = self
            .domains
            .read()
            .map_err(|_| CatalogError::internal("domain registry lock poisoned"))?;
        Ok(domains.get(name).cloned())
    }

    /// Returns true if `name` is registered.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the lock is poisoned.
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)?.is_some())
    }

    /// Returns the number of registered domains.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        let domains = self
            .domains
            .read()
            .map_err(|_| CatalogError::internal("domain registry lock poisoned"))?;
        Ok(domains.len())
    }

    /// Returns true if nothing is registered.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
