//! Table and column enumeration through the engine catalogs.

use super::SqlAdapter;
use super::connection::map_sqlx_error;
use super::dialect::{SURROGATE_KEY, is_integer_type};
use super::values::column_to_string;
use crate::Result;
use sqlx::Any;

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ColumnInfo {
    pub(super) name: String,
    pub(super) data_type: String,
    pub(super) max_length: Option<String>,
}

impl ColumnInfo {
    /// Data type with `(n)` appended when a maximum length is declared.
    pub(super) fn declared_type(&self) -> String {
        match &self.max_length {
            Some(len) if !len.is_empty() => format!("{}({})", self.data_type, len),
            _ => self.data_type.clone(),
        }
    }

    /// Integer column named `id`: left out of exports, used for ordering.
    pub(super) fn is_surrogate_key(&self) -> bool {
        self.name.eq_ignore_ascii_case(SURROGATE_KEY) && is_integer_type(&self.data_type)
    }
}

impl SqlAdapter {
    pub(super) async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query::<Any>(&self.dialect.list_tables_sql())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(format!("Failed to list tables in '{}'", self.label), e))?;

        Ok(rows
            .iter()
            .filter_map(|row| column_to_string(row, 0))
            .collect())
    }

    /// Declared columns in ordinal order; empty when the table is missing.
    pub(super) async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = sqlx::query::<Any>(&self.dialect.columns_sql())
            .bind(table.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(format!("Failed to read columns of '{}'", table), e))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = column_to_string(row, 0)?;
                Some(ColumnInfo {
                    name,
                    data_type: column_to_string(row, 1).unwrap_or_default(),
                    max_length: column_to_string(row, 2),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str, max_length: Option<&str>) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: data_type.to_string(),
            max_length: max_length.map(str::to_string),
        }
    }

    #[test]
    fn test_declared_type_with_length() {
        assert_eq!(
            column("name", "character varying", Some("50")).declared_type(),
            "character varying(50)"
        );
        assert_eq!(column("name", "text", None).declared_type(), "text");
    }

    #[test]
    fn test_surrogate_key_detection() {
        assert!(column("id", "integer", None).is_surrogate_key());
        assert!(column("ID", "INTEGER", None).is_surrogate_key());
        assert!(!column("id", "TEXT", None).is_surrogate_key());
        assert!(!column("user_id", "integer", None).is_surrogate_key());
    }
}
