//! PostgreSQL scenarios using testcontainers.
//!
//! Requires Docker; run with `cargo test -- --ignored`.

#![cfg(feature = "postgresql")]

use dbman_core::adapters::{DataStoreAdapter, WipeConfirmation, open_adapter};
use dbman_core::config::ConnectionProfile;
use dbman_core::models::{Engine, QueryOutput};
use std::time::Duration;
use testcontainers_modules::{postgres::Postgres, testcontainers::runners::AsyncRunner};

/// Pings until the server accepts connections.
async fn wait_until_ready(adapter: &dyn DataStoreAdapter, max_attempts: u32) {
    for _ in 0..max_attempts {
        if adapter.ping().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("PostgreSQL did not become ready");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_integration_postgres_users_round_trip() {
    let postgres = Postgres::default().start().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();
    let profile = ConnectionProfile::new("pg", Engine::PostgreSql)
        .with_host("127.0.0.1")
        .with_port(port)
        .with_user("postgres", Some("postgres".to_string()))
        .with_database("postgres");
    let adapter = open_adapter(&profile).await.unwrap();
    wait_until_ready(adapter.as_ref(), 30).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("users.csv");
    std::fs::write(&csv, "name,age\nAna,30\nBo,25\n").unwrap();

    let report = adapter.import_csv(&csv, None).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(adapter.list_containers().await.unwrap(), vec!["users"]);

    let described = adapter.describe_structure("users").await.unwrap();
    assert_eq!(described.field_names(), vec!["id", "name", "age"]);

    let out = dir.path().join("out.csv");
    adapter.export_csv("users", &out).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "name,age\nAna,30\nBo,25\n"
    );

    match adapter
        .execute_raw_query("SELECT name FROM users ORDER BY id")
        .await
        .unwrap()
    {
        QueryOutput::Table(result) => assert_eq!(result.rows, vec![vec!["Ana"], vec!["Bo"]]),
        other => panic!("expected a table, got {:?}", other),
    }

    let err = adapter
        .execute_raw_query("SELECT * FROM no_such_table")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no_such_table"), "{}", err);

    let wiped = adapter
        .delete_all_containers(WipeConfirmation::pre_approved())
        .await
        .unwrap();
    assert_eq!(wiped.succeeded, 1);
    assert!(adapter.list_containers().await.unwrap().is_empty());
    adapter.close().await;
}
