//! Contract tests for the catalog store port, run against the in-memory store.

use std::sync::Arc;

use schemata_core::prelude::*;
use serde_json::json;

fn store() -> Arc<dyn CatalogStore> {
    Arc::new(MemoryCatalogStore::new())
}

#[tokio::test]
async fn concurrent_puts_with_same_id_have_one_winner() {
    let store = store();
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.put(json!({ "attempt": i }), Some("shared")).await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task should not panic") {
            Ok(_) => winners += 1,
            Err(Error::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 15);
}

#[tokio::test]
async fn tenant_and_type_filters_compose() {
    let store = store();
    let corpus = [
        ("e1", "acme", "schemaEntityType"),
        ("e2", "acme", "indexProvider"),
        ("e3", "acme", "ontology"),
        ("e4", "globex", "schemaEntityType"),
    ];
    for (id, tenant, tag) in corpus {
        let mut source = json!({ "tenant": tenant });
        source[tag] = json!({ "name": id });
        store.put(source, Some(id)).await.expect("put");
    }

    let tenant_only = StructuredQuery {
        filters: vec![Clause::term("tenant", "acme")],
        size: 100,
        ..StructuredQuery::default()
    };
    let result = store.search(&tenant_only).await.expect("search");
    assert_eq!(result.total_hits, 3);

    let mut narrowed = tenant_only.clone();
    narrowed.filters.push(Clause::AnyOf(vec![
        Clause::exists("schemaEntityType"),
        Clause::exists("indexProvider"),
    ]));
    let result = store.search(&narrowed).await.expect("search");
    let ids: Vec<&str> = result.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e2"]);
    assert!(result.hits.len() as u64 <= result.total_hits);
}

#[tokio::test]
async fn paging_past_the_end_returns_no_hits() {
    let store = store();
    store.put(json!({ "tenant": "acme" }), None).await.expect("put");

    let query = StructuredQuery {
        from: 5,
        size: 10,
        ..StructuredQuery::default()
    };
    let result = store.search(&query).await.expect("search");
    assert!(result.hits.is_empty());
    assert_eq!(result.total_hits, 1);
}
