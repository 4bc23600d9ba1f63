//! Data directives end to end: resolve, validate, persist, inject, clean.

mod common;

use common::*;
use graph_fixtures::loader::DataSourceResolver;
use graph_fixtures::prelude::*;
use std::collections::BTreeMap;

#[tokio::test]
async fn test_inline_graph_is_loaded_and_linked() {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("test_pgdata_with_object")
        .arg("pg_driver")
        .mark(DataMark::new(family_graph()).name("pgdata").driver("pg_driver"));

    session
        .run_test(&item, |bindings| async move {
            assert_eq!(bindings.nodes("pgdata").unwrap().len(), 2);

            let driver = bindings.handle("pg_driver").unwrap();
            let tx = driver.begin().await.unwrap();
            let dana = tx.get("dana-1").await.unwrap().unwrap();
            assert_eq!(dana.label, "mother");
            assert_eq!(tx.related("dana-1", "sons").await.unwrap().len(), 1);
        })
        .await
        .unwrap();
}

async fn load_sample_with_honorific(resource: &str) {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("test_pgdata_with_file")
        .arg("pg_driver")
        .mark(
            DataMark::new(resource)
                .name("pg_data")
                .driver("pg_driver")
                .data_dir(data_dir())
                .extension(Honorific),
        );

    session
        .run_test(&item, |bindings| async move {
            assert_eq!(bindings.nodes("pg_data").unwrap().len(), 3);

            let driver = bindings.handle("pg_driver").unwrap();
            let father = fetch(&driver, "father-1").await.unwrap();
            assert_eq!(father.str_property("name"), Some("Mr. Samson O."));
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_yaml_resource_with_extension() {
    load_sample_with_honorific("sample.yaml").await;
}

#[tokio::test]
async fn test_json_resource_with_extension() {
    load_sample_with_honorific("sample.json").await;
}

#[tokio::test]
async fn test_file_and_inline_load_the_same_nodes() {
    async fn persisted(resource: Resource) -> Vec<(String, String)> {
        let session = session(&["pg_driver"]).await;
        let item = TestItem::new("t").mark(DataMark::new(resource).name("data"));
        session
            .run_test(&item, |bindings| async move {
                let mut nodes: Vec<(String, String)> = bindings
                    .nodes("data")
                    .unwrap()
                    .iter()
                    .map(|n| (n.label.clone(), n.node_id.clone()))
                    .collect();
                nodes.sort();
                nodes
            })
            .await
            .unwrap()
    }

    let from_file = persisted(Resource::File("sample.yaml".into())).await;
    let inline = DataSourceResolver::new(Some(data_dir()))
        .resolve(&"sample.json".into())
        .await
        .unwrap();
    let from_inline = persisted(Resource::Inline(inline)).await;

    assert_eq!(from_file, from_inline);
    assert_eq!(from_file.len(), 3);
}

#[tokio::test]
async fn test_unknown_handle_lists_known_handles() {
    let session = session(&["pgx_driver"]).await;
    let item = TestItem::new("t").mark(DataMark::new(family_graph()).driver("pg_driver"));

    let err = session.setup(&item).await.unwrap_err();
    match &err {
        FixtureError::UnknownHandle { name, known } => {
            assert_eq!(name, "pg_driver");
            assert_eq!(known, &vec!["pgx_driver".to_string()]);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().contains("pgx_driver"));
    assert_eq!(
        session.fixture_state("pgx_driver").await,
        Some(FixtureState::Configured)
    );
}

#[tokio::test]
async fn test_invalid_data_persists_nothing() {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("t")
        .arg("pg_driver")
        .mark(DataMark::new("invalid.yaml").driver("pg_driver"));

    let err = session.setup(&item).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    let FixtureError::Validation(validation) = &err else {
        panic!("unexpected error {:?}", err);
    };
    assert_eq!(validation.resource, "invalid.yaml");
    let messages: Vec<String> = validation.violations.iter().map(|v| v.to_string()).collect();
    assert!(messages.contains(&"nodes[1]: unknown label 'uncle'".to_string()));

    let ctx = session.setup(&TestItem::new("next").arg("pg_driver")).await.unwrap();
    assert_eq!(count(&ctx.handle("pg_driver").unwrap()).await, 0);
    session.teardown(ctx).await.unwrap();
}

#[tokio::test]
async fn test_test_body_sees_its_own_changes() {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("test_with_fixture")
        .arg("pg_driver")
        .mark(DataMark::new(family_graph()).name("pgdata").driver("pg_driver"));

    let ctx = session.setup(&item).await.unwrap();
    let driver = ctx.handle("pg_driver").unwrap();

    let mut tx = driver.begin().await.unwrap();
    let mut dana = tx.get("dana-1").await.unwrap().unwrap();
    dana.set_property("name", "Dana D. O.");
    tx.add(dana).await.unwrap();
    tx.commit().await.unwrap();

    let dana = fetch(&driver, "dana-1").await.unwrap();
    assert_eq!(dana.str_property("name"), Some("Dana D. O."));
    assert_eq!(ctx.nodes("pgdata").unwrap().len(), 2);

    session.teardown(ctx).await.unwrap();
    assert_eq!(count(&driver).await, 0);
}

#[tokio::test]
async fn test_directive_injects_its_handle_without_arg() {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("test_with_fixture__no_inject")
        .mark(DataMark::new(family_graph()).driver("pg_driver"));

    let ctx = session.setup(&item).await.unwrap();
    assert!(ctx.handle("pg_driver").is_ok());
    assert_eq!(ctx.nodes(DEFAULT_DATA_NAME).unwrap().len(), 2);
    session.teardown(ctx).await.unwrap();
    assert!(!session.lookup().contains(DEFAULT_DATA_NAME));
}

#[tokio::test]
async fn test_submitter_ids_resolve_edges() {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("t").mark(DataMark::new("submitters.yaml").name("data"));

    session
        .run_test(&item, |bindings| async move {
            let nodes = bindings.nodes("data").unwrap();
            let mother = nodes.iter().find(|n| n.label == "mother").unwrap();
            let daughter = nodes.iter().find(|n| n.label == "daughter").unwrap();
            assert_eq!(mother.str_property("submitter_id"), Some("mother-a"));

            let driver = bindings.handle("pg_driver").unwrap();
            let tx = driver.begin().await.unwrap();
            let daughters = tx.related(&mother.node_id, "daughters").await.unwrap();
            assert_eq!(daughters.len(), 1);
            assert_eq!(daughters[0].node_id, daughter.node_id);
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_post_processors_run_after_extension() {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("t").mark(
        DataMark::new(family_graph())
            .name("data")
            .extension(Honorific)
            .post_processor(|node| {
                if let Some(name) = node.str_property("name") {
                    let name = name.to_uppercase();
                    node.set_property("name", name);
                }
            }),
    );

    session
        .run_test(&item, |bindings| async move {
            let driver = bindings.handle("pg_driver").unwrap();
            let dana = fetch(&driver, "dana-1").await.unwrap();
            assert_eq!(dana.str_property("name"), Some("MR. DANA O."));
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mock_all_props_and_globals() {
    let config = FixtureConfig::new().with_handle(
        "pg_driver",
        handle_config().with_global("project_id", "CGCI-BLGSP"),
    );
    let session = FixtureSession::builder().start(&config).await.unwrap();
    let item = TestItem::new("t").mark(
        DataMark::new(family_graph())
            .name("data")
            .mock_all_props(true),
    );

    session
        .run_test(&item, |bindings| async move {
            let nodes = bindings.nodes("data").unwrap();
            let son = nodes.iter().find(|n| n.node_id == "sn-1").unwrap();
            assert_eq!(son.str_property("name"), Some("Son O Dana"));
            assert_eq!(son.str_property("project_id"), Some("CGCI-BLGSP"));
            assert_eq!(son.str_property("state"), Some("validated"));
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_extends_merges_summaries() {
    let resolver = DataSourceResolver::new(Some(data_dir()));

    let derived = resolver.resolve(&"derived.yaml".into()).await.unwrap();
    assert_eq!(derived.nodes.len(), 2);
    assert_eq!(derived.summary, Some(BTreeMap::from([("father".to_string(), 1)])));

    let summed = resolver.resolve(&"derived_summary.json".into()).await.unwrap();
    assert_eq!(summed.summary, Some(BTreeMap::from([("father".to_string(), 3)])));
}

#[tokio::test]
async fn test_extended_data_is_loaded() {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("t").mark(DataMark::new("derived.yaml").name("data"));

    session
        .run_test(&item, |bindings| async move {
            let driver = bindings.handle("pg_driver").unwrap();
            let tx = driver.begin().await.unwrap();
            let sons = tx.related("father-1", "sons").await.unwrap();
            assert_eq!(sons.len(), 1);
            assert_eq!(sons[0].node_id, "son-1");
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unsupported_extension() {
    let session = session(&["pg_driver"]).await;
    let item = TestItem::new("t").mark(DataMark::new("dictionary.txt"));

    let err = session.setup(&item).await.unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    assert!(err.to_string().contains("\"json\", \"yaml\", \"yml\""));
}
