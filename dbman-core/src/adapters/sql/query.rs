//! Raw SQL execution.

use super::SqlAdapter;
use super::connection::map_sqlx_error;
use super::values::row_to_display;
use crate::Result;
use crate::error::DbManError;
use crate::models::{QueryOutput, QueryResult};
use futures::TryStreamExt;
use sqlx::{Column, Either, Row};

impl SqlAdapter {
    /// Runs operator SQL unmodified through the simple query protocol.
    ///
    /// Any returned rows produce a table whose columns come from the first
    /// row. Without rows the summed affected count is reported instead.
    pub(super) async fn run_raw_query(&self, query: &str) -> Result<QueryOutput> {
        let text = query.trim();
        if text.is_empty() {
            return Err(DbManError::malformed("query text is empty"));
        }
        tracing::debug!("Raw query on '{}': {}", self.label, text);

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        let mut affected: u64 = 0;
        let mut stream = sqlx::raw_sql(text).fetch_many(&self.pool);
        while let Some(step) = stream
            .try_next()
            .await
            .map_err(|e| map_sqlx_error(format!("Query on '{}' failed", self.label), e))?
        {
            match step {
                Either::Left(result) => {
                    affected = affected.saturating_add(result.rows_affected());
                }
                Either::Right(row) => {
                    if columns.is_empty() {
                        columns = row
                            .columns()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                    }
                    rows.push(row_to_display(&row));
                }
            }
        }

        if rows.is_empty() && columns.is_empty() {
            return Ok(QueryOutput::Records(vec![format!(
                "{} row(s) affected",
                affected
            )]));
        }
        Ok(QueryOutput::Table(QueryResult { columns, rows }))
    }
}
