//! SQL text generation per relational engine.
//!
//! Everything dialect-specific lives here: identifier quoting, placeholder
//! syntax, catalog queries, surrogate key DDL and the wipe statements.
//! Identifiers typed by the operator must pass
//! [`validate_identifier`](crate::validation::validate_identifier) before
//! they reach these builders.
//!
//! Catalog and export queries cast every column to text. The `Any` driver
//! cannot decode engine-specific types such as PostgreSQL's
//! `information_schema.sql_identifier` domain or `NUMERIC`, but it always
//! decodes text.

use crate::models::Engine;

/// Name of the surrogate key column added to created tables.
pub const SURROGATE_KEY: &str = "id";

/// The relational engines behind the `Any` pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDialect {
    /// Engine this dialect speaks for.
    pub fn engine(self) -> Engine {
        match self {
            SqlDialect::Postgres => Engine::PostgreSql,
            SqlDialect::MySql => Engine::MySql,
            SqlDialect::Sqlite => Engine::Sqlite,
        }
    }

    /// Quotes an identifier, doubling any embedded quote character.
    ///
    /// Names typed by the operator are allow-listed before they get here;
    /// names read back from the catalog are only quoted.
    pub fn quote(self, ident: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{}`", ident.replace('`', "``")),
            SqlDialect::Postgres | SqlDialect::Sqlite => {
                format!("\"{}\"", ident.replace('"', "\"\""))
            }
        }
    }

    /// Bind placeholder for the 1-based parameter `n`.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}", n),
            SqlDialect::MySql | SqlDialect::Sqlite => "?".to_string(),
        }
    }

    /// Casts an expression to the dialect's text type.
    pub fn cast_to_text(self, expr: &str) -> String {
        match self {
            SqlDialect::MySql => format!("CAST({} AS CHAR)", expr),
            SqlDialect::Postgres | SqlDialect::Sqlite => format!("CAST({} AS TEXT)", expr),
        }
    }

    /// Lists base tables of the active schema, sorted by name.
    pub fn list_tables_sql(self) -> String {
        match self {
            SqlDialect::Postgres => format!(
                "SELECT {} FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
                self.cast_to_text("table_name")
            ),
            SqlDialect::MySql => format!(
                "SELECT {} FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
                self.cast_to_text("table_name")
            ),
            SqlDialect::Sqlite => "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name"
                .to_string(),
        }
    }

    /// Column name, data type and maximum length of one table, in ordinal
    /// order. Takes the table name as its single bound parameter.
    pub fn columns_sql(self) -> String {
        match self {
            SqlDialect::Postgres | SqlDialect::MySql => {
                let schema = if self == SqlDialect::Postgres {
                    "current_schema()"
                } else {
                    "DATABASE()"
                };
                format!(
                    "SELECT {}, {}, {} FROM information_schema.columns \
                     WHERE table_schema = {} AND table_name = {} \
                     ORDER BY ordinal_position",
                    self.cast_to_text("column_name"),
                    self.cast_to_text("data_type"),
                    self.cast_to_text("character_maximum_length"),
                    schema,
                    self.placeholder(1)
                )
            }
            SqlDialect::Sqlite => {
                "SELECT name, type, NULL FROM pragma_table_info(?) ORDER BY cid".to_string()
            }
        }
    }

    /// Surrogate key column definition.
    pub fn surrogate_key_ddl(self) -> String {
        let column = self.quote(SURROGATE_KEY);
        match self {
            SqlDialect::Postgres => format!("{} SERIAL PRIMARY KEY", column),
            SqlDialect::MySql => format!("{} INT AUTO_INCREMENT PRIMARY KEY", column),
            SqlDialect::Sqlite => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", column),
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` with one text column per field.
    ///
    /// A surrogate key is prepended unless `columns` already has an `id`
    /// column.
    pub fn create_table_sql(self, table: &str, columns: &[String]) -> String {
        let mut defs: Vec<String> = Vec::with_capacity(columns.len().saturating_add(1));
        if !has_surrogate_key(columns) {
            defs.push(self.surrogate_key_ddl());
        }
        defs.extend(columns.iter().map(|c| format!("{} TEXT", self.quote(c))));
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quote(table),
            defs.join(", ")
        )
    }

    /// Parameterized single-row insert.
    pub fn insert_sql(self, table: &str, columns: &[String]) -> String {
        let names: Vec<String> = columns.iter().map(|c| self.quote(c)).collect();
        let params: Vec<String> = (1..=columns.len()).map(|n| self.placeholder(n)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote(table),
            names.join(", "),
            params.join(", ")
        )
    }

    /// Selects `columns` as text, ordered by `order_by` when given.
    pub fn select_text_sql(
        self,
        table: &str,
        columns: &[String],
        order_by: Option<&str>,
        limit: Option<usize>,
    ) -> String {
        let exprs: Vec<String> = columns
            .iter()
            .map(|c| self.cast_to_text(&self.quote(c)))
            .collect();
        let mut sql = format!("SELECT {} FROM {}", exprs.join(", "), self.quote(table));
        if let Some(key) = order_by {
            sql.push_str(&format!(" ORDER BY {}", self.quote(key)));
        }
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        sql
    }

    /// Drops one table during a wipe.
    pub fn drop_table_sql(self, table: &str) -> String {
        match self {
            SqlDialect::Postgres => format!("DROP TABLE IF EXISTS {} CASCADE", self.quote(table)),
            SqlDialect::MySql | SqlDialect::Sqlite => {
                format!("DROP TABLE IF EXISTS {}", self.quote(table))
            }
        }
    }

    /// Statements run on the wipe connection before and after dropping, so
    /// tables can be dropped in any order despite foreign keys.
    pub fn foreign_key_toggle(self) -> Option<(&'static str, &'static str)> {
        match self {
            SqlDialect::Postgres => None,
            SqlDialect::MySql => Some(("SET FOREIGN_KEY_CHECKS = 0", "SET FOREIGN_KEY_CHECKS = 1")),
            SqlDialect::Sqlite => Some(("PRAGMA foreign_keys = OFF", "PRAGMA foreign_keys = ON")),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.engine())
    }
}

/// True when a column list already carries the surrogate key name.
pub fn has_surrogate_key(columns: &[String]) -> bool {
    columns.iter().any(|c| c.eq_ignore_ascii_case(SURROGATE_KEY))
}

/// Type names that declare an integer column.
const INTEGER_TYPES: &[&str] = &[
    "int",
    "integer",
    "tinyint",
    "smallint",
    "mediumint",
    "bigint",
    "int2",
    "int4",
    "int8",
    "serial",
    "smallserial",
    "bigserial",
];

/// True for declared types that hold integers (`integer`, `int`, `bigint`...).
///
/// Only the leading type word counts, so `int unsigned` and `int(11)` match
/// while `point` or `interval` do not.
pub fn is_integer_type(declared: &str) -> bool {
    let lowered = declared.trim().to_ascii_lowercase();
    let word = lowered
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();
    INTEGER_TYPES.contains(&word)
}
