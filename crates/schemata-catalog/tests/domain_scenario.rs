//! Domain compilation end to end: duplicates, missing references, and
//! concurrent registration.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;

use http::StatusCode;
use schemata_catalog::{
    CatalogError, CreateDomainRequest, DomainRegistry, GetDomainRequest, GetObjectRequest,
};
use schemata_test_utils::{
    RecordingStore, StoreOp, alice, create_entity, init_test_logging, mallory, service_over,
};

#[tokio::test]
async fn sample_schema_scenario() {
    init_test_logging();
    let store = RecordingStore::new();
    let service = service_over(&store);

    let created = service
        .create_domain(&alice(), CreateDomainRequest::new("sampleSchema", vec![]))
        .await
        .unwrap();
    assert_eq!(created.object_id, "sampleSchema");
    assert!(created.entities.is_empty());

    let fetched = service
        .get_domain(&alice(), GetDomainRequest::new("sampleSchema"))
        .await
        .unwrap();
    assert_eq!(fetched.domain.name, "sampleSchema");
    assert!(fetched.domain.entities.is_empty());

    let err = service
        .create_domain(&alice(), CreateDomainRequest::new("sampleSchema", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateName { ref name } if name == "sampleSchema"));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let e1 = service
        .create(&alice(), create_entity("E1", "Book"))
        .await
        .unwrap()
        .object_id;
    let with_entity = service
        .create_domain(
            &alice(),
            CreateDomainRequest::new("schemaWithEntity", vec![e1.clone()]),
        )
        .await
        .unwrap();
    assert_eq!(with_entity.entities, vec![e1]);

    let err = service
        .create_domain(&alice(), CreateDomainRequest::new("badDomain", vec!["ghost".into()]))
        .await
        .unwrap_err();
    let CatalogError::MissingReferences { ref missing } = err else {
        panic!("expected MissingReferences, got {err:?}");
    };
    assert_eq!(missing, &BTreeSet::from(["ghost".to_string()]));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert!(!service.registry().contains("badDomain").unwrap());
    assert!(
        service
            .get(&alice(), GetObjectRequest::by_ids(["badDomain"]))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn missing_set_is_exactly_the_unresolved_ids() {
    let store = RecordingStore::new();
    let service = service_over(&store);
    for (id, name) in [("a", "A"), ("c", "C")] {
        service.create(&alice(), create_entity(id, name)).await.unwrap();
    }

    let refs: Vec<String> = ["a", "b", "c", "d", "b"].map(String::from).to_vec();
    let err = service
        .create_domain(&alice(), CreateDomainRequest::new("partial", refs))
        .await
        .unwrap_err();
    let CatalogError::MissingReferences { ref missing } = err else {
        panic!("expected MissingReferences, got {err:?}");
    };
    assert_eq!(missing, &BTreeSet::from(["b".to_string(), "d".to_string()]));
}

#[tokio::test]
async fn references_are_fetched_in_one_round_trip() {
    let store = RecordingStore::new();
    let service = service_over(&store);
    service.create(&alice(), create_entity("x", "X")).await.unwrap();
    service.create(&alice(), create_entity("y", "Y")).await.unwrap();
    store.clear_operations();

    let created = service
        .create_domain(
            &alice(),
            CreateDomainRequest::new("ordered", vec!["y".into(), "x".into()]),
        )
        .await
        .unwrap();
    assert_eq!(created.entities, vec!["y", "x"]);

    let multi_gets = store
        .operations()
        .into_iter()
        .filter(|op| matches!(op, StoreOp::MultiGet { .. }))
        .count();
    assert_eq!(multi_gets, 1);
    assert!(
        !store
            .operations()
            .iter()
            .any(|op| matches!(op, StoreOp::Get { .. }))
    );
}

#[tokio::test]
async fn references_in_another_tenant_are_denied() {
    let store = RecordingStore::new();
    let service = service_over(&store);
    service
        .create(&mallory(), create_entity("theirs", "Secret"))
        .await
        .unwrap();

    let err = service
        .create_domain(&alice(), CreateDomainRequest::new("snoop", vec!["theirs".into()]))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::PermissionDenied { .. }));
    assert!(!service.registry().contains("snoop").unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_compilations_have_one_winner() {
    let store = RecordingStore::new();
    let registry = Arc::new(DomainRegistry::new());
    let service = service_over(&store).with_registry(Arc::clone(&registry));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create_domain(&alice(), CreateDomainRequest::new("contested", vec![]))
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(CatalogError::DuplicateName { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(registry.len().unwrap(), 1);
}
