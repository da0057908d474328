//! Table creation, CSV import/export, describe and wipe.

use super::SqlAdapter;
use super::catalog::ColumnInfo;
use super::connection::map_sqlx_error;
use super::values::{column_to_string, row_to_strings};
use crate::Result;
use crate::codec::{self, data_line_number};
use crate::error::DbManError;
use crate::models::{
    ExportSummary, FieldDescription, FieldSet, OperationReport, StructureReport,
};
use crate::validation::{container_name_from_path, validate_identifier};
use sqlx::Any;
use std::path::Path;

impl SqlAdapter {
    async fn execute_statement(&self, sql: &str) -> Result<()> {
        tracing::debug!("Executing: {}", sql);
        sqlx::query::<Any>(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(format!("Statement failed on '{}'", self.label), e))?;
        Ok(())
    }

    pub(super) async fn create_table(&self, name: &str, columns: &[String]) -> Result<()> {
        validate_identifier(name)?;
        for column in columns {
            validate_identifier(column)?;
        }
        self.execute_statement(&self.dialect.create_table_sql(name, columns))
            .await?;
        tracing::info!("Table '{}' is present", name);
        Ok(())
    }

    /// Strict import: a malformed row anywhere rejects the whole file
    /// before anything is written. Insert failures are per row.
    pub(super) async fn import_file(
        &self,
        path: &Path,
        container: Option<&str>,
    ) -> Result<OperationReport> {
        let table = match container {
            Some(name) => name.to_string(),
            None => container_name_from_path(path)?,
        };
        validate_identifier(&table)?;

        let csv = codec::read_csv_file(path).await?;
        let columns: Vec<String> = csv.header.names().to_vec();
        for column in &columns {
            validate_identifier(column)?;
        }
        let records = csv.strict_records()?;

        self.create_table(&table, &columns).await?;

        let insert = self.dialect.insert_sql(&table, &columns);
        tracing::debug!("Insert statement: {}", insert);
        let mut report = OperationReport::new("import", Some(table.clone()));

        for (index, record) in records.iter().enumerate() {
            let mut query = sqlx::query::<Any>(&insert);
            for value in record.values() {
                query = query.bind(value.to_string());
            }
            match query.execute(&self.pool).await {
                Ok(_) => report.record_success(),
                Err(e) => match map_sqlx_error(format!("Import into '{}' failed", table), e) {
                    err @ DbManError::Connection { .. } => return Err(err),
                    err => {
                        let line = data_line_number(index);
                        tracing::warn!("Line {} of {} not imported: {}", line, path.display(), err);
                        report.record_failure(format!("line {}", line), err.to_string());
                    }
                },
            }
        }

        tracing::info!(
            "Imported {} rows into '{}' ({} failed)",
            report.succeeded,
            table,
            report.failures.len()
        );
        Ok(report)
    }

    async fn existing_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let columns = self.table_columns(table).await?;
        if columns.is_empty() {
            return Err(DbManError::not_found("Table", table));
        }
        Ok(columns)
    }

    /// Exports every column except the integer surrogate key, ordered by
    /// that key when the table has one.
    pub(super) async fn export_table(&self, table: &str, out_path: &Path) -> Result<ExportSummary> {
        validate_identifier(table)?;
        let columns = self.existing_columns(table).await?;

        let order_key = columns
            .iter()
            .find(|c| c.is_surrogate_key())
            .map(|c| c.name.clone());
        let exported: Vec<String> = columns
            .iter()
            .filter(|c| !c.is_surrogate_key())
            .map(|c| c.name.clone())
            .collect();
        let field_set = FieldSet::from_header(exported.iter().cloned())?;

        let rows: Vec<Vec<String>> = if exported.is_empty() {
            Vec::new()
        } else {
            let sql = self
                .dialect
                .select_text_sql(table, &exported, order_key.as_deref(), None);
            tracing::debug!("Export query: {}", sql);
            sqlx::query::<Any>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(format!("Export of '{}' failed", table), e))?
                .iter()
                .map(row_to_strings)
                .collect()
        };

        codec::write_csv_file(out_path, &codec::encode_rows(&field_set, &rows)).await?;
        tracing::info!(
            "Exported {} rows from '{}' to {}",
            rows.len(),
            table,
            out_path.display()
        );

        Ok(ExportSummary {
            container: table.to_string(),
            path: out_path.to_path_buf(),
            field_set,
            rows_written: rows.len(),
        })
    }

    /// All declared columns, sampled from the first row.
    pub(super) async fn describe_table(&self, table: &str) -> Result<StructureReport> {
        validate_identifier(table)?;
        let columns = self.table_columns(table).await?;
        if columns.is_empty() {
            return Ok(StructureReport::no_data(table));
        }

        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let order_key = columns
            .iter()
            .find(|c| c.is_surrogate_key())
            .map(|c| c.name.as_str());
        let sql = self
            .dialect
            .select_text_sql(table, &names, order_key, Some(1));
        let first_row = sqlx::query::<Any>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(format!("Describe of '{}' failed", table), e))?;

        let fields = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let sample = first_row.as_ref().and_then(|row| column_to_string(row, i));
                FieldDescription::sampled(
                    column.name.clone(),
                    sample.as_deref(),
                    Some(column.declared_type()),
                )
            })
            .collect();

        Ok(StructureReport::fields(table, fields))
    }

    /// Drops every table on one connection, continuing past failures.
    pub(super) async fn drop_all_tables(&self) -> Result<OperationReport> {
        let tables = self.list_tables().await?;
        let mut report = OperationReport::new("wipe", None);
        if tables.is_empty() {
            return Ok(report);
        }

        let mut conn = self.pool.acquire().await.map_err(|e| {
            DbManError::connection_failed(format!("Wipe of '{}' could not connect", self.label), e)
        })?;
        let toggle = self.dialect.foreign_key_toggle();

        if let Some((disable, _)) = toggle {
            sqlx::query::<Any>(disable)
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("Failed to disable foreign key checks", e))?;
        }

        for table in &tables {
            let sql = self.dialect.drop_table_sql(table);
            tracing::debug!("Executing: {}", sql);
            match sqlx::query::<Any>(&sql).execute(&mut *conn).await {
                Ok(_) => report.record_success(),
                Err(e) => {
                    let err = map_sqlx_error(format!("Dropping '{}' failed", table), e);
                    tracing::warn!("Failed to drop table '{}': {}", table, err);
                    report.record_failure(table.clone(), err.to_string());
                }
            }
        }

        if let Some((_, enable)) = toggle
            && let Err(e) = sqlx::query::<Any>(enable).execute(&mut *conn).await
        {
            tracing::warn!("Failed to re-enable foreign key checks: {}", e);
        }

        tracing::info!(
            "Dropped {} of {} tables in '{}'",
            report.succeeded,
            tables.len(),
            self.label
        );
        Ok(report)
    }
}
