//! Unit tests that need no running server.

use super::*;
use crate::error::DbManError;

/// Profile pointing at a port nothing listens on, with a short selection
/// timeout so failures surface quickly.
fn unreachable_profile() -> ConnectionProfile {
    ConnectionProfile::new("offline", Engine::MongoDb)
        .with_url("mongodb://127.0.0.1:9/shop?serverSelectionTimeoutMS=300")
}

#[tokio::test]
async fn test_connect_is_lazy_and_picks_database() {
    let adapter = MongoAdapter::connect(&unreachable_profile())
        .await
        .expect("client construction does not touch the network");
    assert_eq!(adapter.database_name(), "shop");
    assert_eq!(adapter.engine(), Engine::MongoDb);
    adapter.close().await;
}

#[tokio::test]
async fn test_profile_database_wins_over_default() {
    let profile = ConnectionProfile::new("local", Engine::MongoDb)
        .with_host("127.0.0.1")
        .with_port(9)
        .with_database("inventory");
    let adapter = MongoAdapter::connect(&profile).await.unwrap();
    assert_eq!(adapter.database_name(), "inventory");

    let fallback = MongoAdapter::connect(&ConnectionProfile::new("bare", Engine::MongoDb))
        .await
        .unwrap();
    assert_eq!(fallback.database_name(), DEFAULT_DATABASE);
}

#[tokio::test]
async fn test_ping_unreachable_server_is_connection_error() {
    let adapter = MongoAdapter::connect(&unreachable_profile()).await.unwrap();
    let err = adapter.ping().await.unwrap_err();
    assert!(err.is_connection(), "{}", err);
    adapter.close().await;
}

#[tokio::test]
async fn test_invalid_collection_names_fail_before_io() {
    let adapter = MongoAdapter::connect(&unreachable_profile()).await.unwrap();
    for name in ["", "bad$name", "system.users"] {
        let err = adapter.create_container(name, None).await.unwrap_err();
        assert!(
            matches!(err, DbManError::InvalidIdentifier { .. }),
            "{}: {}",
            name,
            err
        );
    }
    let err = adapter.describe_structure("a$b").await.unwrap_err();
    assert!(matches!(err, DbManError::InvalidIdentifier { .. }));
}

#[tokio::test]
async fn test_raw_query_must_be_json_object() {
    let adapter = MongoAdapter::connect(&unreachable_profile()).await.unwrap();
    for query in ["", "db.users.find()", "[1, 2]", "\"ping\""] {
        let err = adapter.execute_raw_query(query).await.unwrap_err();
        assert!(
            matches!(err, DbManError::MalformedInput { .. }),
            "{:?}: {}",
            query,
            err
        );
    }
}

#[tokio::test]
async fn test_import_missing_file_is_not_found() {
    let adapter = MongoAdapter::connect(&unreachable_profile()).await.unwrap();
    let err = adapter
        .import_csv(Path::new("/nonexistent/dir/people.csv"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbManError::NotFound { .. }), "{}", err);
}

#[tokio::test]
async fn test_close_twice() {
    let adapter = MongoAdapter::connect(&unreachable_profile()).await.unwrap();
    adapter.close().await;
    adapter.close().await;
}

