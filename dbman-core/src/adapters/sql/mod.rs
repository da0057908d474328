//! Relational adapter for PostgreSQL, MySQL and SQLite.
//!
//! # Module Structure
//! - `dialect`: per-engine SQL text (quoting, placeholders, catalogs, DDL)
//! - `connection`: lazy `Any` pool creation, ping and close
//! - `catalog`: table and column enumeration
//! - `transfer`: create, import, export, describe and wipe
//! - `query`: raw SQL execution
//! - `values`: rendering of row values as strings
//!
//! # Conventions
//! Tables created here get an integer surrogate key `id` unless the supplied
//! columns already name one, and every other column is `TEXT`. Export leaves
//! the integer `id` out and writes rows in key order, so a file imported
//! into a fresh table exports back with its original header and row order.
//!
//! # Known limitation
//! Raw queries go through the `Any` driver, which cannot decode some
//! engine-specific types (for example PostgreSQL `NUMERIC` or `TIMESTAMP`).
//! Such queries fail with the driver's message; casting the column to text
//! in the query avoids it. Export and describe cast every column themselves.

mod catalog;
mod connection;
mod dialect;
mod query;
mod transfer;
mod values;


use super::{DataStoreAdapter, WipeConfirmation};
use crate::Result;
use crate::models::{Engine, ExportSummary, FieldSet, OperationReport, QueryOutput, StructureReport};
use async_trait::async_trait;
use sqlx::AnyPool;
use std::path::Path;
use std::sync::atomic::AtomicBool;

pub use dialect::{SURROGATE_KEY, SqlDialect};

/// Relational adapter over a pooled `Any` connection.
pub struct SqlAdapter {
    pool: AnyPool,
    dialect: SqlDialect,
    label: String,
    closed: AtomicBool,
}

impl std::fmt::Debug for SqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlAdapter")
            .field("dialect", &self.dialect)
            .field("label", &self.label)
            // connection URL is never kept
            .finish_non_exhaustive()
    }
}

impl SqlAdapter {
    /// Dialect in use.
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

#[async_trait]
impl DataStoreAdapter for SqlAdapter {
    fn engine(&self) -> Engine {
        self.dialect.engine()
    }

    async fn ping(&self) -> Result<()> {
        self.ping_internal().await
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        self.list_tables().await
    }

    async fn create_container(&self, name: &str, columns: Option<&FieldSet>) -> Result<()> {
        let columns = columns.map(|c| c.names().to_vec()).unwrap_or_default();
        self.create_table(name, &columns).await
    }

    async fn import_csv(&self, path: &Path, container: Option<&str>) -> Result<OperationReport> {
        self.import_file(path, container).await
    }

    async fn export_csv(&self, container: &str, out_path: &Path) -> Result<ExportSummary> {
        self.export_table(container, out_path).await
    }

    async fn delete_all_containers(
        &self,
        _confirmation: WipeConfirmation,
    ) -> Result<OperationReport> {
        self.drop_all_tables().await
    }

    async fn describe_structure(&self, container: &str) -> Result<StructureReport> {
        self.describe_table(container).await
    }

    async fn execute_raw_query(&self, query: &str) -> Result<QueryOutput> {
        self.run_raw_query(query).await
    }

    async fn close(&self) {
        self.close_internal().await;
    }
}
