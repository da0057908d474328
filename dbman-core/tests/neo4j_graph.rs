//! Neo4j scenarios using testcontainers.
//!
//! Requires Docker; run with `cargo test -- --ignored`.

#![cfg(feature = "neo4j")]

use dbman_core::adapters::{DataStoreAdapter, WipeConfirmation, open_adapter};
use dbman_core::config::ConnectionProfile;
use dbman_core::error::DbManError;
use dbman_core::models::{Engine, QueryOutput, StructureDescription};
use std::time::Duration;
use testcontainers_modules::neo4j::Neo4j;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

async fn wait_until_ready(adapter: &dyn DataStoreAdapter, max_attempts: u32) {
    for _ in 0..max_attempts {
        if adapter.ping().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
    panic!("Neo4j did not become ready");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_integration_neo4j_nodes_round_trip() {
    let container = Neo4j::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(7687).await.unwrap();
    let image = container.image();
    let profile = ConnectionProfile::new("graph", Engine::Neo4j)
        .with_host("127.0.0.1")
        .with_port(port)
        .with_user(
            image.user().unwrap_or("neo4j"),
            image.password().map(str::to_string),
        );
    let adapter = open_adapter(&profile).await.unwrap();
    wait_until_ready(adapter.as_ref(), 60).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("Person.csv");
    std::fs::write(&csv, "name,age\nAna,30\nBo,25\n").unwrap();

    let report = adapter.import_csv(&csv, None).await.unwrap();
    assert_eq!(report.container.as_deref(), Some("Person"));
    assert_eq!(report.succeeded, 2);
    assert_eq!(adapter.list_containers().await.unwrap(), vec!["Person"]);

    let described = adapter.describe_structure("Person").await.unwrap();
    match described.description {
        StructureDescription::Fields(fields) => {
            assert_eq!(fields.len(), 2);
            assert!(fields.iter().all(|f| f.declared_type.as_deref() == Some("string")));
        }
        StructureDescription::NoData => panic!("Person has nodes"),
    }

    let out = dir.path().join("people.csv");
    let summary = adapter.export_csv("Person", &out).await.unwrap();
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.field_set.len(), 2);

    let err = adapter
        .export_csv("Ghost", &dir.path().join("ghost.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbManError::NotFound { .. }));

    match adapter
        .execute_raw_query("MATCH (p:Person) RETURN p.name AS name ORDER BY name")
        .await
        .unwrap()
    {
        QueryOutput::Table(result) => {
            assert_eq!(result.columns, vec!["name"]);
            assert_eq!(result.rows, vec![vec!["Ana"], vec!["Bo"]]);
        }
        other => panic!("expected a table, got {:?}", other),
    }

    let wiped = adapter
        .delete_all_containers(WipeConfirmation::pre_approved())
        .await
        .unwrap();
    assert!(wiped.is_complete());
    let empty = adapter.describe_structure("Person").await.unwrap();
    assert_eq!(empty.description, StructureDescription::NoData);
    adapter.close().await;
    assert!(adapter.ping().await.unwrap_err().is_connection());
    assert!(adapter.list_containers().await.unwrap_err().is_connection());
    adapter.close().await;
}
