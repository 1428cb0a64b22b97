//! Property-based tests for catalog invariants.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use tokio_test::block_on;

use schemata_catalog::prelude::*;
use schemata_catalog::{EncodeOptions, GetObjectResponse};
use schemata_core::TenantId;
use schemata_test_utils::{RecordingStore, alice, create_entity, service_over};

fn arb_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _{}:-]{0,16}"
}

fn arb_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,11}"
}

fn arb_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_id(), 0..4)
}

fn arb_entity_type() -> impl Strategy<Value = SchemaEntityType> {
    (
        arb_text(),
        prop::option::of(arb_text()),
        prop::option::of(arb_text()),
        prop::option::of(arb_list()),
        arb_text(),
    )
        .prop_map(|(kind, name, description, catalog, content)| SchemaEntityType {
            kind,
            name,
            description,
            catalog,
            content,
        })
}

fn arb_index_provider() -> impl Strategy<Value = IndexProvider> {
    (
        arb_text(),
        prop::option::of(arb_text()),
        prop::option::of(arb_list()),
        arb_text(),
    )
        .prop_map(|(kind, name, indices, ontology)| IndexProvider {
            kind,
            name,
            indices,
            ontology,
            ..IndexProvider::default()
        })
}

fn arb_ontology() -> impl Strategy<Value = Ontology> {
    (arb_text(), prop::option::of(arb_text()), prop::option::of(arb_list())).prop_map(
        |(name, description, namespace)| Ontology {
            name,
            description,
            namespace,
            ..Ontology::default()
        },
    )
}

fn arb_domain() -> impl Strategy<Value = SchemaDomain> {
    (arb_id(), prop::option::of(arb_text()), arb_list()).prop_map(
        |(name, description, entities)| SchemaDomain {
            description,
            ..SchemaDomain::new(name, entities)
        },
    )
}

fn arb_payload() -> impl Strategy<Value = ObjectPayload> {
    prop_oneof![
        arb_entity_type().prop_map(ObjectPayload::from),
        arb_index_provider().prop_map(ObjectPayload::from),
        arb_domain().prop_map(ObjectPayload::from),
        arb_ontology().prop_map(ObjectPayload::from),
    ]
}

/// Millisecond timestamps; the structured form carries no finer precision.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800_000).prop_map(|ms| DateTime::from_timestamp_millis(ms).unwrap())
}

fn arb_document() -> impl Strategy<Value = CatalogDocument> {
    (
        arb_id(),
        arb_instant(),
        arb_instant(),
        "[a-z]{1,8}",
        arb_list(),
        arb_payload(),
    )
        .prop_map(
            |(id, updated_at, created_at, tenant, access, payload)| CatalogDocument {
                id,
                updated_at,
                created_at,
                tenant: TenantId::new(tenant).unwrap(),
                access,
                payload,
            },
        )
}

proptest! {
    /// INVARIANT: both codecs reproduce every payload variant.
    #[test]
    fn payloads_round_trip_through_both_codecs(payload in arb_payload()) {
        let bytes = payload.to_bytes().unwrap();
        let codec = schemata_catalog::registry::codec_for(payload.object_type()).unwrap();
        let mut input = schemata_catalog::codec::StreamInput::new(&bytes);
        let from_binary = (codec.decode_binary)(&mut input).unwrap();
        prop_assert_eq!(&from_binary, &payload);

        let value = payload.to_structured_value().unwrap();
        let from_structured =
            schemata_catalog::registry::decode(payload.object_type(), &value).unwrap();
        prop_assert_eq!(&from_structured, &payload);
    }

    /// INVARIANT: the two document encodings decode to the same value.
    #[test]
    fn documents_agree_across_codecs(doc in arb_document()) {
        let from_binary = CatalogDocument::from_bytes(&doc.to_bytes().unwrap()).unwrap();
        let value = doc.to_structured(EncodeOptions::REST).unwrap();
        let from_structured = CatalogDocument::from_structured(&value, None).unwrap();
        prop_assert_eq!(&from_binary, &doc);
        prop_assert_eq!(&from_structured, &from_binary);
        prop_assert_eq!(from_structured.object_type(), doc.payload.object_type());
    }

    /// INVARIANT: stored sources never carry the id; it is supplied on read.
    #[test]
    fn stored_form_omits_id(doc in arb_document()) {
        let value = doc.to_structured(EncodeOptions::STORAGE).unwrap();
        prop_assert!(value.get("objectId").is_none());
        let restored = CatalogDocument::from_structured(&value, Some(&doc.id)).unwrap();
        prop_assert_eq!(restored, doc);
    }

    /// INVARIANT: an unregistered tag is reported, never dropped.
    #[test]
    fn unknown_tags_fail_with_unknown_type(tag in "x[a-z]{3,10}") {
        let value = serde_json::json!({
            "objectId": "id",
            "lastUpdatedTimeMs": 1,
            "createdTimeMs": 1,
            tag.clone(): {},
        });
        let err = CatalogDocument::from_structured(&value, None).unwrap_err();
        let reported = matches!(err, CatalogError::UnknownType { tag: ref t } if *t == tag);
        prop_assert!(reported, "expected UnknownType({}), got {:?}", tag, err);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// INVARIANT: the missing set is exactly `refs - resolvable(refs)`.
    #[test]
    fn missing_references_are_exact(
        present in prop::collection::btree_set("e[0-9]{1,3}", 0..5),
        refs in prop::collection::vec("e[0-9]{1,3}", 0..8),
    ) {
        let missing = block_on(async {
            let store = RecordingStore::new();
            let service = service_over(&store);
            for id in &present {
                service.create(&alice(), create_entity(id, id)).await.unwrap();
            }
            service
                .create_domain(&alice(), CreateDomainRequest::new("prop", refs.clone()))
                .await
                .map(|created| {
                    assert_eq!(created.entities, refs);
                    BTreeSet::new()
                })
                .or_else(|err| match err {
                    CatalogError::MissingReferences { missing } => Ok(missing),
                    other => Err(other),
                })
                .unwrap()
        });

        let expected: BTreeSet<String> = refs
            .iter()
            .filter(|id| !present.contains(*id))
            .cloned()
            .collect();
        prop_assert_eq!(missing, expected);
    }

    /// INVARIANT: a page never holds more than requested or than exists.
    #[test]
    fn search_pages_are_bounded(count in 0usize..12, from in 0usize..14, size in 1usize..6) {
        let response: GetObjectResponse = block_on(async {
            let store = RecordingStore::new();
            let service = service_over(&store);
            for i in 0..count {
                let id = format!("e{i}");
                service.create(&alice(), create_entity(&id, &id)).await.unwrap();
            }
            service
                .search(&alice(), SearchRequest::default().with_page(from, size))
                .await
                .unwrap()
        });
        let result = response.result;
        prop_assert_eq!(result.total_hits, count as u64);
        prop_assert!(result.objects.len() <= size);
        prop_assert!(result.objects.len() as u64 <= result.total_hits);
        prop_assert_eq!(result.objects.len(), count.saturating_sub(from).min(size));
    }
}
