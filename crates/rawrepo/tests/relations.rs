//! Relation replacement, validation and merged views over a fixture repo.

mod common;

use std::collections::BTreeSet;

use common::{Fixture, id};
use rawrepo_core::Error;
use rawrepo_core::error::ValidationViolation;

#[tokio::test]
async fn test_set_and_get_relations() {
    let repo = Fixture::new()
        .add("870970:H")
        .add("870970:S")
        .add("191919:S")
        .build()
        .await;

    repo.set_relations_from(&id("870970:S"), &BTreeSet::from([id("870970:H")]))
        .await
        .unwrap();
    repo.set_relations_from(&id("191919:S"), &BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(
        repo.get_relations_parents(&id("870970:S")).await.unwrap(),
        BTreeSet::from([id("870970:H")])
    );
    assert_eq!(
        repo.get_relations_children(&id("870970:H")).await.unwrap(),
        BTreeSet::from([id("870970:S")])
    );
    assert!(repo.get_relations_from(&id("191919:S")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_set_keeps_old_edges() {
    let repo = Fixture::new()
        .add("870970:H1")
        .add("870970:H2")
        .add("870970:S:870970:H1")
        .build()
        .await;

    let err = repo
        .set_relations_from(
            &id("870970:S"),
            &BTreeSet::from([id("870970:H1"), id("870970:H2")]),
        )
        .await
        .unwrap_err();
    match err {
        Error::Validation(e) => {
            assert_eq!(e.violation, ValidationViolation::TooManyParents { found: 2 })
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        repo.get_relations_from(&id("870970:S")).await.unwrap(),
        BTreeSet::from([id("870970:H1")])
    );
}

#[tokio::test]
async fn test_self_relation_rejected() {
    let repo = Fixture::new().add("870970:R").build().await;

    let err = repo
        .set_relations_from(&id("870970:R"), &BTreeSet::from([id("870970:R")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_relation_to_missing_target() {
    let repo = Fixture::new().add("870970:S").build().await;

    let err = repo
        .set_relations_from(&id("870970:S"), &BTreeSet::from([id("870970:H")]))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_merged_view_of_enrichment() {
    let repo = Fixture::new().add("870970:R").add("191919:R:870970").build().await;

    let merged = repo.fetch_merged_record("R", 191919, false).await.unwrap();
    assert_eq!(merged.enrichment_trail(), "870970,191919");
    assert!(merged.is_enriched());
    assert_eq!(merged.id(), &id("191919:R"));
}

#[tokio::test]
async fn test_collection_spans_hierarchy() {
    let repo = Fixture::new()
        .add("870970:H")
        .add("870970:S:870970:H")
        .add("870970:B:870970:S")
        .build()
        .await;

    let collection = repo.fetch_record_collection("B", 870970, false).await.unwrap();
    let keys: BTreeSet<&str> = collection.keys().map(String::as_str).collect();
    assert_eq!(keys, BTreeSet::from(["B", "S", "H"]));
}
