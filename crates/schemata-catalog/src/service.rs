//! Catalog service facade.
//!
//! Entry point for every catalog operation. Each call validates the caller,
//! runs inside a `catalog` (or `domain`) span, and talks to the store only
//! through [`CatalogIndex`].

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;

use schemata_core::observability::{catalog_span, domain_span};
use schemata_core::{CatalogStore, DeleteStatus, ObjectId};

use crate::access::{AccessControl, Caller, RoleAccessControl};
use crate::config::CatalogConfig;
use crate::domain::compiler::DomainCompiler;
use crate::domain::registry::DomainRegistry;
use crate::error::{CatalogError, Result};
use crate::index::CatalogIndex;
use crate::model::document::{CatalogDocument, EncodeOptions};
use crate::model::object_type::ObjectType;
use crate::model::payload::SchemaDomain;
use crate::model::search_result::SearchResult;
use crate::query_builder::{self, SearchRequest, SearchScope};
use crate::request::{
    CreateDomainRequest, CreateObjectRequest, DeleteObjectRequest, GetDomainRequest,
    GetObjectRequest, UpdateObjectRequest,
};
use crate::response::{
    CreateDomainResponse, CreateObjectResponse, DeleteObjectResponse, GetDomainResponse,
    GetObjectResponse, ObjectIdResponse, UpdateObjectResponse,
};

/// Catalog operations over a document store.
#[derive(Clone)]
pub struct CatalogService {
    index: CatalogIndex,
    registry: Arc<DomainRegistry>,
    access: Arc<dyn AccessControl>,
    config: CatalogConfig,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("index", &self.index)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    /// Creates a service over `store` using the process-wide domain
    /// registry and role-based access control.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>, config: CatalogConfig) -> Self {
        Self {
            index: CatalogIndex::new(store, config.operation_timeout()),
            registry: DomainRegistry::global(),
            access: Arc::new(RoleAccessControl::new(&config)),
            config,
        }
    }

    /// Uses `registry` instead of the process-wide one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<DomainRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the access-control collaborator.
    #[must_use]
    pub fn with_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    /// Returns the domain registry this service compiles into.
    #[must_use]
    pub fn registry(&self) -> &Arc<DomainRegistry> {
        &self.registry
    }

    /// Returns the service configuration.
    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn presentation(&self, caller: &Caller) -> EncodeOptions {
        if self.access.has_all_info_access(caller) {
            EncodeOptions::REST
        } else {
            EncodeOptions::REST.without_access()
        }
    }

    fn ensure_access(&self, caller: &Caller, doc: &CatalogDocument) -> Result<()> {
        if self.access.has_access(caller, &doc.tenant, &doc.access) {
            Ok(())
        } else {
            tracing::warn!(id = %doc.id, caller = caller.label(), "access denied");
            Err(CatalogError::permission_denied(format!(
                "permission denied for object {}",
                doc.id
            )))
        }
    }

    /// Fetches all `ids`, failing with every missing id named.
    async fn fetch_all(&self, ids: &[String], caller: &Caller) -> Result<Vec<CatalogDocument>> {
        let docs = self.index.multi_get(ids).await?;
        let found: BTreeSet<&str> = docs.iter().map(|doc| doc.id.as_str()).collect();
        let missing: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| !found.contains(id))
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::not_found(format!(
                "objects not found: {}",
                missing.join(", ")
            )));
        }
        for doc in &docs {
            self.ensure_access(caller, doc)?;
        }
        Ok(docs)
    }

    /// Creates an object.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for unusable callers, `InvalidRequest` for
    /// an invalid id, `Conflict` if the id is taken, or a store failure.
    pub async fn create(
        &self,
        caller: &Caller,
        request: CreateObjectRequest,
    ) -> Result<CreateObjectResponse> {
        self.access.validate_caller(caller)?;
        let identity = self.access.identity_of(caller);
        let span = catalog_span("create", identity.tenant.as_str());
        async move {
            if let Some(id) = &request.object_id {
                ObjectId::new(id.clone())?;
            }
            let now = Utc::now();
            let doc = CatalogDocument {
                id: String::new(),
                updated_at: now,
                created_at: now,
                tenant: identity.tenant,
                access: identity.access,
                payload: request.payload,
            };
            let id = self.index.create(&doc, request.object_id.as_deref()).await?;
            tracing::info!(id = %id, object_type = %doc.object_type(), "object created");
            Ok(ObjectIdResponse::new(id))
        }
        .instrument(span)
        .await
    }

    /// Fetches objects by id, or searches when the request has no ids.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` naming every missing id, `PermissionDenied` on the
    /// first inaccessible object, or the errors of [`Self::search`].
    pub async fn get(&self, caller: &Caller, request: GetObjectRequest) -> Result<GetObjectResponse> {
        if request.object_ids.is_empty() {
            return self.search(caller, request.search).await;
        }
        self.access.validate_caller(caller)?;
        let identity = self.access.identity_of(caller);
        let span = catalog_span("get", identity.tenant.as_str());
        async move {
            let objects = if let [id] = request.object_ids.as_slice() {
                let doc = self.index.get(id).await?;
                self.ensure_access(caller, &doc)?;
                vec![doc]
            } else {
                self.fetch_all(&request.object_ids, caller).await?
            };
            tracing::debug!(count = objects.len(), "objects fetched");
            Ok(GetObjectResponse {
                result: SearchResult::from_objects(objects),
                options: self.presentation(caller),
            })
        }
        .instrument(span)
        .await
    }

    /// Searches the caller's tenant.
    ///
    /// # Errors
    ///
    /// Returns `UnrecognizedFilter` or `InvalidRequest` for a bad request,
    /// or a store failure.
    pub async fn search(&self, caller: &Caller, request: SearchRequest) -> Result<GetObjectResponse> {
        self.access.validate_caller(caller)?;
        let identity = self.access.identity_of(caller);
        let span = catalog_span("search", identity.tenant.as_str());
        async move {
            let scope = SearchScope {
                tenant: identity.tenant,
                access: self.access.search_access(caller),
            };
            let query =
                query_builder::build(&request, &scope, self.config.default_items_query_count)?;
            let hits = self.index.search(&query).await?;
            let result = query_builder::reshape(hits, &request)?;
            tracing::debug!(
                returned = result.objects.len(),
                total = result.total_hits,
                relation = result.total_hit_relation.as_str(),
                "search complete"
            );
            Ok(GetObjectResponse {
                result,
                options: self.presentation(caller),
            })
        }
        .instrument(span)
        .await
    }

    /// Replaces an object's payload.
    ///
    /// The creation time and tenant are kept. The access list is taken from
    /// the caller, unless the caller carries no tokens (the system caller),
    /// in which case the stored list stays.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `PermissionDenied`, `Conflict` when the payload
    /// type differs from the stored one, or `InvalidRequest` for domains.
    pub async fn update(
        &self,
        caller: &Caller,
        request: UpdateObjectRequest,
    ) -> Result<UpdateObjectResponse> {
        self.access.validate_caller(caller)?;
        let identity = self.access.identity_of(caller);
        let span = catalog_span("update", identity.tenant.as_str());
        async move {
            if request.payload.object_type() == ObjectType::SchemaDomain {
                return Err(CatalogError::invalid_request(
                    "domains are compiled once and cannot be updated",
                ));
            }
            let existing = self.index.get(&request.object_id).await?;
            self.ensure_access(caller, &existing)?;
            if existing.object_type() != request.payload.object_type() {
                return Err(CatalogError::Conflict {
                    message: format!(
                        "object {} is {}, not {}",
                        existing.id,
                        existing.object_type(),
                        request.payload.object_type()
                    ),
                });
            }
            let access = if identity.access.is_empty() {
                existing.access
            } else {
                identity.access
            };
            let doc = CatalogDocument {
                id: existing.id,
                updated_at: Utc::now(),
                created_at: existing.created_at,
                tenant: existing.tenant,
                access,
                payload: request.payload,
            };
            self.index.update(&doc).await?;
            tracing::info!(id = %doc.id, "object updated");
            Ok(ObjectIdResponse::new(doc.id))
        }
        .instrument(span)
        .await
    }

    /// Deletes one or more objects.
    ///
    /// Several ids are all checked before any is deleted, then removed in
    /// one bulk call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an empty id set, `NotFound`,
    /// `PermissionDenied`, or a store failure.
    pub async fn delete(
        &self,
        caller: &Caller,
        request: DeleteObjectRequest,
    ) -> Result<DeleteObjectResponse> {
        self.access.validate_caller(caller)?;
        let identity = self.access.identity_of(caller);
        let span = catalog_span("delete", identity.tenant.as_str());
        async move {
            let statuses = match request.object_ids.as_slice() {
                [] => return Err(CatalogError::invalid_request("no object ids to delete")),
                [id] => {
                    let doc = self.index.get(id).await?;
                    self.ensure_access(caller, &doc)?;
                    self.index.delete(id).await?;
                    [(id.clone(), DeleteStatus::Deleted)].into()
                }
                ids => {
                    self.fetch_all(ids, caller).await?;
                    self.index.bulk_delete(ids).await?
                }
            };
            tracing::info!(count = statuses.len(), "objects deleted");
            Ok(DeleteObjectResponse { statuses })
        }
        .instrument(span)
        .await
    }

    /// Compiles a domain and stores its document.
    ///
    /// Compilation registers the domain before the document is written. If
    /// the write fails, the registration stays and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an invalid name, the errors of
    /// [`DomainCompiler::compile`], or a store failure.
    pub async fn create_domain(
        &self,
        caller: &Caller,
        request: CreateDomainRequest,
    ) -> Result<CreateDomainResponse> {
        self.access.validate_caller(caller)?;
        let identity = self.access.identity_of(caller);
        let span = domain_span("create", &request.name, identity.tenant.as_str());
        async move {
            ObjectId::new(request.name.clone())?;
            let compiler =
                DomainCompiler::new(&self.index, &self.registry, self.access.as_ref());
            let resource = compiler
                .compile(&request.name, &request.entities, caller)
                .await?;

            let now = Utc::now();
            let doc = CatalogDocument {
                id: String::new(),
                updated_at: now,
                created_at: now,
                tenant: identity.tenant,
                access: identity.access,
                payload: SchemaDomain {
                    name: request.name.clone(),
                    description: request.description,
                    catalog: request.catalog,
                    entities: resource.entities().to_vec(),
                }
                .into(),
            };
            let id = self
                .index
                .create(&doc, Some(&request.name))
                .await
                .inspect_err(|e| {
                    tracing::warn!(
                        error = %e,
                        "domain registered but its document was not stored"
                    );
                })?;
            Ok(CreateDomainResponse {
                object_id: id,
                entities: resource.entities().to_vec(),
            })
        }
        .instrument(span)
        .await
    }

    /// Fetches a stored domain and its compiled resource.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no domain document has this name, or
    /// `PermissionDenied`.
    pub async fn get_domain(
        &self,
        caller: &Caller,
        request: GetDomainRequest,
    ) -> Result<GetDomainResponse> {
        self.access.validate_caller(caller)?;
        let identity = self.access.identity_of(caller);
        let span = domain_span("get", &request.name, identity.tenant.as_str());
        async move {
            let doc = self.index.get(&request.name).await?;
            self.ensure_access(caller, &doc)?;
            let domain = doc
                .payload
                .as_domain()
                .cloned()
                .ok_or_else(|| CatalogError::not_found(format!("no domain named {}", request.name)))?;
            let compiled = self.registry.get(&request.name)?;
            if compiled.is_none() {
                tracing::debug!("domain stored but not compiled in this process");
            }
            Ok(GetDomainResponse {
                object_id: doc.id,
                domain,
                compiled,
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::User;
    use crate::model::payload::{IndexProvider, Ontology, SchemaEntityType};
    use schemata_core::MemoryCatalogStore;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryCatalogStore::new()), CatalogConfig::default())
            .with_registry(Arc::new(DomainRegistry::new()))
    }

    fn alice() -> Caller {
        User::new("alice").with_tenant("acme").into()
    }

    fn bob() -> Caller {
        User::new("bob").with_tenant("acme").into()
    }

    fn entity(name: &str) -> CreateObjectRequest {
        CreateObjectRequest::new(SchemaEntityType {
            name: Some(name.into()),
            ..SchemaEntityType::default()
        })
    }

    #[tokio::test]
    async fn create_then_get_single() {
        let service = service();
        let created = service.create(&alice(), entity("Book")).await.unwrap();
        let response = service
            .get(&alice(), GetObjectRequest::by_ids([created.object_id.clone()]))
            .await
            .unwrap();
        assert_eq!(response.result.objects.len(), 1);
        assert_eq!(response.result.total_hits, 1);
        let doc = &response.result.objects[0];
        assert_eq!(doc.id, created.object_id);
        assert_eq!(doc.tenant.as_str(), "acme");
        assert_eq!(doc.access, vec!["User:alice"]);
    }

    #[tokio::test]
    async fn invalid_object_id_is_rejected() {
        let err = service()
            .create(&alice(), entity("Book").with_id("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn other_users_are_denied() {
        let service = service();
        let id = service.create(&alice(), entity("Book")).await.unwrap().object_id;
        let err = service
            .get(&bob(), GetObjectRequest::by_ids([id]))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn multi_get_names_every_missing_id() {
        let service = service();
        let id = service.create(&alice(), entity("Book")).await.unwrap().object_id;
        let err = service
            .get(&alice(), GetObjectRequest::by_ids([id.as_str(), "m1", "m2"]))
            .await
            .unwrap_err();
        let CatalogError::NotFound { ref message } = err else {
            panic!("expected NotFound, got {err:?}");
        };
        assert!(message.contains("m1") && message.contains("m2"));
        assert!(!message.contains(&id));
    }

    #[tokio::test]
    async fn get_without_ids_searches() {
        let service = service();
        service.create(&alice(), entity("Book")).await.unwrap();
        service
            .create(&alice(), CreateObjectRequest::new(Ontology::default()))
            .await
            .unwrap();
        let request = GetObjectRequest::search(
            SearchRequest::default().with_types([ObjectType::SchemaEntityType]),
        );
        let response = service.get(&alice(), request).await.unwrap();
        assert_eq!(response.result.total_hits, 1);
        assert_eq!(
            response.result.objects[0].object_type(),
            ObjectType::SchemaEntityType
        );
    }

    #[tokio::test]
    async fn search_hides_other_users_objects() {
        let service = service();
        service.create(&alice(), entity("Book")).await.unwrap();
        service.create(&bob(), entity("Author")).await.unwrap();
        let response = service
            .search(&alice(), SearchRequest::default())
            .await
            .unwrap();
        assert_eq!(response.result.total_hits, 1);
        assert_eq!(response.result.objects[0].payload.name(), Some("Book"));
        assert!(response.options.include_access);
    }

    #[tokio::test]
    async fn update_keeps_created_time_and_rejects_type_change() {
        let service = service();
        let id = service.create(&alice(), entity("Book")).await.unwrap().object_id;
        let before = service
            .get(&alice(), GetObjectRequest::by_ids([id.clone()]))
            .await
            .unwrap()
            .result
            .objects
            .remove(0);

        let renamed = SchemaEntityType {
            name: Some("Novel".into()),
            ..SchemaEntityType::default()
        };
        service
            .update(&alice(), UpdateObjectRequest::new(id.clone(), renamed))
            .await
            .unwrap();
        let after = service
            .get(&alice(), GetObjectRequest::by_ids([id.clone()]))
            .await
            .unwrap()
            .result
            .objects
            .remove(0);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.payload.name(), Some("Novel"));

        let err = service
            .update(&alice(), UpdateObjectRequest::new(id, IndexProvider::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { .. }));
    }

    #[tokio::test]
    async fn system_update_keeps_tenant_and_access() {
        let service = service();
        let id = service.create(&alice(), entity("Book")).await.unwrap().object_id;
        let renamed = SchemaEntityType {
            name: Some("Novel".into()),
            ..SchemaEntityType::default()
        };
        service
            .update(&Caller::System, UpdateObjectRequest::new(id.clone(), renamed))
            .await
            .unwrap();

        let after = service
            .get(&alice(), GetObjectRequest::by_ids([id]))
            .await
            .unwrap()
            .result
            .objects
            .remove(0);
        assert_eq!(after.tenant.as_str(), "acme");
        assert_eq!(after.access, vec!["User:alice"]);
        assert_eq!(after.payload.name(), Some("Novel"));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let err = service()
            .update(&alice(), UpdateObjectRequest::new("ghost", Ontology::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_single_and_bulk() {
        let service = service();
        let a = service.create(&alice(), entity("A")).await.unwrap().object_id;
        let b = service.create(&alice(), entity("B")).await.unwrap().object_id;
        let c = service.create(&alice(), entity("C")).await.unwrap().object_id;

        let single = service
            .delete(&alice(), DeleteObjectRequest::new([a.clone()]))
            .await
            .unwrap();
        assert_eq!(single.statuses[&a], DeleteStatus::Deleted);

        let bulk = service
            .delete(&alice(), DeleteObjectRequest::new([b.clone(), c.clone()]))
            .await
            .unwrap();
        assert_eq!(bulk.statuses.len(), 2);
        assert!(bulk.statuses.values().all(|s| *s == DeleteStatus::Deleted));
    }

    #[tokio::test]
    async fn bulk_delete_checks_before_deleting() {
        let service = service();
        let a = service.create(&alice(), entity("A")).await.unwrap().object_id;
        let err = service
            .delete(&alice(), DeleteObjectRequest::new([a.as_str(), "ghost"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
        assert!(
            service
                .get(&alice(), GetObjectRequest::by_ids([a]))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn empty_delete_is_invalid() {
        let err = service()
            .delete(&alice(), DeleteObjectRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn domain_round_trip() {
        let service = service();
        let e1 = service.create(&alice(), entity("Book")).await.unwrap().object_id;
        let created = service
            .create_domain(&alice(), CreateDomainRequest::new("library", vec![e1.clone()]))
            .await
            .unwrap();
        assert_eq!(created.object_id, "library");
        assert_eq!(created.entities, vec![e1.clone()]);

        let fetched = service
            .get_domain(&alice(), GetDomainRequest::new("library"))
            .await
            .unwrap();
        assert_eq!(fetched.domain.entities, vec![e1]);
        assert_eq!(fetched.compiled.unwrap().name(), "library");
    }

    #[tokio::test]
    async fn domains_cannot_be_updated() {
        let err = service()
            .update(
                &alice(),
                UpdateObjectRequest::new("d", SchemaDomain::new("d", vec![])),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn get_domain_of_plain_object_is_not_found() {
        let service = service();
        service.create(&alice(), entity("Book").with_id("book")).await.unwrap();
        let err = service
            .get_domain(&alice(), GetDomainRequest::new("book"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }
}
