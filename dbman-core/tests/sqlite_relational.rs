//! Relational scenarios against a real SQLite file.
//!
//! Covers the full operation contract through `open_adapter` and the
//! dispatcher: import, list, describe, export, idempotent create, wipe,
//! strict malformed-row handling and the export escaping gap.

#![cfg(feature = "sqlite")]

use dbman_core::adapters::{DataStoreAdapter, WipeConfirmation, open_adapter};
use dbman_core::config::ConnectionProfile;
use dbman_core::dispatcher::{Operation, OperationOutcome, dispatch};
use dbman_core::error::DbManError;
use dbman_core::models::{Engine, FieldSet, QueryOutput, StructureDescription};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

async fn open_sqlite(dir: &TempDir) -> Box<dyn DataStoreAdapter> {
    let profile = ConnectionProfile::new("it", Engine::Sqlite)
        .with_database(dir.path().join("it.db").display().to_string());
    open_adapter(&profile).await.expect("sqlite adapter")
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_users_import_describe_export() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = open_sqlite(&dir).await;
    let csv = write_file(&dir, "users.csv", "name,age\nAna,30\nBo,25\n");

    let report = adapter.import_csv(&csv, None).await.unwrap();
    assert_eq!(report.container.as_deref(), Some("users"));
    assert_eq!(report.succeeded, 2);
    assert!(report.is_complete());

    assert_eq!(adapter.list_containers().await.unwrap(), vec!["users"]);

    let described = adapter.describe_structure("users").await.unwrap();
    assert_eq!(described.field_names(), vec!["id", "name", "age"]);
    match &described.description {
        StructureDescription::Fields(fields) => {
            assert_eq!(fields[1].sample.as_deref(), Some("Ana"));
            assert_eq!(fields[2].sample.as_deref(), Some("30"));
        }
        StructureDescription::NoData => panic!("users has rows"),
    }

    let out = dir.path().join("users_out.csv");
    let summary = adapter.export_csv("users", &out).await.unwrap();
    assert_eq!(summary.field_set.names(), ["name", "age"]);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(read_file(&out), "name,age\nAna,30\nBo,25\n");

    adapter.close().await;
}

#[tokio::test]
async fn test_create_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = open_sqlite(&dir).await;
    let columns = FieldSet::from_header(["sku", "qty"]).unwrap();

    adapter
        .create_container("stock", Some(&columns))
        .await
        .unwrap();
    adapter
        .create_container("stock", Some(&columns))
        .await
        .unwrap();
    assert_eq!(adapter.list_containers().await.unwrap(), vec!["stock"]);

    let out = dir.path().join("stock.csv");
    let summary = adapter.export_csv("stock", &out).await.unwrap();
    assert_eq!(summary.rows_written, 0);
    assert_eq!(read_file(&out), "sku,qty\n");
    adapter.close().await;
}

#[tokio::test]
async fn test_wipe_removes_every_table() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = open_sqlite(&dir).await;
    adapter.create_container("a", None).await.unwrap();
    adapter.create_container("b", None).await.unwrap();
    let csv = write_file(&dir, "c.csv", "x\n1\n");
    adapter.import_csv(&csv, None).await.unwrap();

    let report = adapter
        .delete_all_containers(WipeConfirmation::pre_approved())
        .await
        .unwrap();
    assert_eq!(report.succeeded, 3);
    assert!(report.is_complete());
    assert!(adapter.list_containers().await.unwrap().is_empty());

    // Wiping an empty database is not an error.
    let again = adapter
        .delete_all_containers(WipeConfirmation::pre_approved())
        .await
        .unwrap();
    assert_eq!(again.succeeded, 0);
    adapter.close().await;
}

#[tokio::test]
async fn test_malformed_row_rejects_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = open_sqlite(&dir).await;
    let csv = write_file(&dir, "people.csv", "name,age\nAna,30\nBo\n");

    let err = adapter.import_csv(&csv, None).await.unwrap_err();
    assert!(matches!(err, DbManError::MalformedInput { .. }), "{}", err);
    assert!(err.to_string().contains("line 3"), "{}", err);
    assert!(adapter.list_containers().await.unwrap().is_empty());
    adapter.close().await;
}

#[tokio::test]
async fn test_exported_commas_are_escaped_but_not_reimportable() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = open_sqlite(&dir).await;
    let columns = FieldSet::from_header(["city", "note"]).unwrap();
    adapter
        .create_container("places", Some(&columns))
        .await
        .unwrap();
    adapter
        .execute_raw_query("INSERT INTO places (city, note) VALUES ('Lyon', 'a,b')")
        .await
        .unwrap();

    let out = dir.path().join("places.csv");
    adapter.export_csv("places", &out).await.unwrap();
    assert_eq!(read_file(&out), "city,note\nLyon,a\\,b\n");

    // Import splits naively, so the escaped comma yields an extra column.
    let err = adapter.import_csv(&out, Some("places_copy")).await.unwrap_err();
    assert!(matches!(err, DbManError::MalformedInput { .. }));
    adapter.close().await;
}

#[tokio::test]
async fn test_missing_file_and_table() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = open_sqlite(&dir).await;

    let err = adapter
        .import_csv(&dir.path().join("absent.csv"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbManError::NotFound { .. }), "{}", err);

    let err = adapter
        .export_csv("absent", &dir.path().join("absent_out.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbManError::NotFound { .. }), "{}", err);
    adapter.close().await;
}

#[tokio::test]
async fn test_explicit_container_overrides_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = open_sqlite(&dir).await;
    let csv = write_file(&dir, "data.csv", "id,label\n7,seven\n");

    let report = adapter.import_csv(&csv, Some("numbers")).await.unwrap();
    assert_eq!(report.succeeded, 1);
    // A supplied id column replaces the surrogate key and is exported.
    let out = dir.path().join("numbers.csv");
    adapter.export_csv("numbers", &out).await.unwrap();
    assert_eq!(read_file(&out), "id,label\n7,seven\n");
    adapter.close().await;
}

#[tokio::test]
async fn test_dispatcher_drives_the_adapter() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = open_sqlite(&dir).await;
    let csv = write_file(&dir, "orders.csv", "item,qty\npen,2\n");

    let outcome = dispatch(
        adapter.as_ref(),
        Operation::ImportCsv {
            path: csv,
            container: None,
        },
    )
    .await
    .unwrap();
    assert!(matches!(outcome, OperationOutcome::Imported(ref r) if r.succeeded == 1));

    let outcome = dispatch(
        adapter.as_ref(),
        Operation::ExecuteRawQuery {
            query: "SELECT item, qty FROM orders".to_string(),
        },
    )
    .await
    .unwrap();
    match outcome {
        OperationOutcome::Queried(QueryOutput::Table(result)) => {
            assert_eq!(result.columns, vec!["item", "qty"]);
            assert_eq!(result.rows, vec![vec!["pen", "2"]]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let err = dispatch(
        adapter.as_ref(),
        Operation::DescribeStructure {
            container: "  ".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbManError::MalformedInput { .. }));
    adapter.close().await;
}
