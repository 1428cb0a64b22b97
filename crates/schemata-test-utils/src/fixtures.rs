//! Pre-built test fixtures for common test scenarios.
//!
//! Provides factory functions for callers, payloads, and services with
//! sensible defaults.

use std::sync::Arc;
use std::time::Duration;

use schemata_catalog::{
    Caller, CatalogConfig, CatalogService, CreateObjectRequest, DomainRegistry, IndexProvider,
    Ontology, SchemaEntityType, User,
};

use crate::storage::RecordingStore;

/// Tenant used by the user fixtures.
pub const TEST_TENANT: &str = "acme";

/// A user in [`TEST_TENANT`] with one backend role.
pub fn alice() -> Caller {
    User::new("alice")
        .with_tenant(TEST_TENANT)
        .with_backend_role("eng")
        .into()
}

/// A second user in [`TEST_TENANT`] sharing no tokens with [`alice`].
pub fn bob() -> Caller {
    User::new("bob")
        .with_tenant(TEST_TENANT)
        .with_backend_role("ops")
        .into()
}

/// A user in another tenant.
pub fn mallory() -> Caller {
    User::new("mallory").with_tenant("evil-corp").into()
}

/// An entity-type payload with the given name.
pub fn entity_type(name: &str) -> SchemaEntityType {
    SchemaEntityType {
        kind: "node".to_string(),
        name: Some(name.to_string()),
        description: Some(format!("{name} entity")),
        catalog: Some(vec!["library".to_string()]),
        content: format!("type {name} {{ id: ID! }}"),
    }
}

/// An index-provider payload with the given name.
pub fn index_provider(name: &str) -> IndexProvider {
    IndexProvider {
        name: Some(name.to_string()),
        indices: Some(vec![format!("{name}-*")]),
        ..IndexProvider::default()
    }
}

/// An ontology payload with the given name.
pub fn ontology(name: &str) -> Ontology {
    Ontology {
        name: name.to_string(),
        namespace: Some(vec!["schema.org".to_string()]),
        ..Ontology::default()
    }
}

/// A create request for an entity type with a fixed id.
pub fn create_entity(id: &str, name: &str) -> CreateObjectRequest {
    CreateObjectRequest::new(entity_type(name)).with_id(id)
}

/// Configuration with a short operation timeout for timeout tests.
pub fn config_with_timeout(timeout: Duration) -> CatalogConfig {
    CatalogConfig {
        operation_timeout_ms: u64::try_from(timeout.as_millis()).expect("timeout fits in u64"),
        ..CatalogConfig::default()
    }
}

/// A service over `store` with a private domain registry.
pub fn service_over(store: &RecordingStore) -> CatalogService {
    service_with_config(store, CatalogConfig::default())
}

/// A service over `store` with the given configuration and a private
/// domain registry.
pub fn service_with_config(store: &RecordingStore, config: CatalogConfig) -> CatalogService {
    CatalogService::new(Arc::new(store.clone()), config)
        .with_registry(Arc::new(DomainRegistry::new()))
}
