//! Redis scenarios using testcontainers.
//!
//! Requires Docker; run with `cargo test -- --ignored`.

#![cfg(feature = "redis")]

use dbman_core::adapters::{WipeConfirmation, open_adapter};
use dbman_core::config::ConnectionProfile;
use dbman_core::error::DbManError;
use dbman_core::models::{Engine, QueryOutput, StructureDescription};
use testcontainers_modules::redis::Redis;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_integration_redis_pairs_round_trip() {
    let container = Redis::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    let profile = ConnectionProfile::new("cache", Engine::Redis)
        .with_host("127.0.0.1")
        .with_port(port);
    let adapter = open_adapter(&profile).await.unwrap();
    adapter.ping().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("pairs.csv");
    std::fs::write(&csv, "key,value\nk1,v1\nk2,v2,ignored\nlonely\n").unwrap();

    let report = adapter.import_csv(&csv, None).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(adapter.list_containers().await.unwrap(), vec!["k1", "k2"]);

    let out = dir.path().join("all.csv");
    let summary = adapter.export_csv("*", &out).await.unwrap();
    assert_eq!(summary.rows_written, 2);
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "key,value\nk1,v1\nk2,v2\n"
    );

    let described = adapter.describe_structure("k1").await.unwrap();
    match described.description {
        StructureDescription::Fields(fields) => {
            assert_eq!(fields[0].sample.as_deref(), Some("v1"));
            assert_eq!(fields[0].declared_type.as_deref(), Some("scalar"));
        }
        StructureDescription::NoData => panic!("k1 exists"),
    }
    let missing = adapter.describe_structure("nope").await.unwrap();
    assert_eq!(missing.description, StructureDescription::NoData);

    adapter
        .execute_raw_query("RPUSH queue a b")
        .await
        .unwrap();
    let listed = adapter.describe_structure("queue").await.unwrap();
    assert_eq!(listed.field_names(), vec!["0", "1"]);

    assert_eq!(
        adapter.execute_raw_query("GET k1").await.unwrap(),
        QueryOutput::Records(vec!["v1".to_string()])
    );
    assert!(matches!(
        adapter.execute_raw_query("FLUSHALL").await,
        Err(DbManError::Unsupported { .. })
    ));

    adapter.create_container("k1", None).await.unwrap();
    assert_eq!(
        adapter.execute_raw_query("GET k1").await.unwrap(),
        QueryOutput::Records(vec!["v1".to_string()])
    );

    let wiped = adapter
        .delete_all_containers(WipeConfirmation::pre_approved())
        .await
        .unwrap();
    assert_eq!(wiped.succeeded, 3);
    assert!(adapter.list_containers().await.unwrap().is_empty());
    adapter.close().await;
    assert!(adapter.ping().await.unwrap_err().is_connection());
    assert!(adapter.list_containers().await.unwrap_err().is_connection());
    adapter.close().await;
}
