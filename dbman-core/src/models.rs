//! Core data models shared by every adapter.
//!
//! These are the plain structures the operation contract exchanges with its
//! caller: backend identity, field sets and tabular records for the CSV
//! boundary, and the result shapes for describe, import, export, wipe and raw
//! queries. Formatting them for a console is the caller's job.

use crate::error::{DbManError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Width applied to sample values in structure reports.
pub const SAMPLE_DISPLAY_WIDTH: usize = 20;

/// The four data models the adapter layer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    Relational,
    Document,
    Graph,
    KeyValue,
}

impl BackendKind {
    /// Backend-specific word for a container, used in messages.
    pub fn container_noun(self) -> &'static str {
        match self {
            BackendKind::Relational => "Table",
            BackendKind::Document => "Collection",
            BackendKind::Graph => "Label",
            BackendKind::KeyValue => "Key",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Relational => write!(f, "relational"),
            BackendKind::Document => write!(f, "document"),
            BackendKind::Graph => write!(f, "graph"),
            BackendKind::KeyValue => write!(f, "key-value"),
        }
    }
}

/// Concrete store engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    PostgreSql,
    MySql,
    Sqlite,
    MongoDb,
    Neo4j,
    Redis,
}

impl Engine {
    /// The data model this engine belongs to.
    pub fn backend_kind(self) -> BackendKind {
        match self {
            Engine::PostgreSql | Engine::MySql | Engine::Sqlite => BackendKind::Relational,
            Engine::MongoDb => BackendKind::Document,
            Engine::Neo4j => BackendKind::Graph,
            Engine::Redis => BackendKind::KeyValue,
        }
    }

    /// Default network port, `None` for file-based engines.
    pub fn default_port(self) -> Option<u16> {
        match self {
            Engine::PostgreSql => Some(5432),
            Engine::MySql => Some(3306),
            Engine::Sqlite => None,
            Engine::MongoDb => Some(27017),
            Engine::Neo4j => Some(7687),
            Engine::Redis => Some(6379),
        }
    }

    /// Whether the engine is reached over the network.
    pub fn is_networked(self) -> bool {
        self.default_port().is_some()
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::PostgreSql => write!(f, "PostgreSQL"),
            Engine::MySql => write!(f, "MySQL"),
            Engine::Sqlite => write!(f, "SQLite"),
            Engine::MongoDb => write!(f, "MongoDB"),
            Engine::Neo4j => write!(f, "Neo4j"),
            Engine::Redis => write!(f, "Redis"),
        }
    }
}

impl std::str::FromStr for Engine {
    type Err = DbManError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Engine::PostgreSql),
            "mysql" | "mariadb" => Ok(Engine::MySql),
            "sqlite" | "sqlite3" => Ok(Engine::Sqlite),
            "mongodb" | "mongo" => Ok(Engine::MongoDb),
            "neo4j" => Ok(Engine::Neo4j),
            "redis" => Ok(Engine::Redis),
            other => Err(DbManError::configuration(format!(
                "Unsupported database type: {}",
                other
            ))),
        }
    }
}

/// Ordered, de-duplicated list of field names.
///
/// Used as the CSV header and as the iteration order for every exported
/// record. Once built for an export call it is not modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    names: Vec<String>,
}

impl FieldSet {
    /// Creates an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a field set from a header, rejecting empty or repeated names.
    pub fn from_header<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(DbManError::malformed(format!(
                    "empty field name at header position {}",
                    set.len().saturating_add(1)
                )));
            }
            if set.contains(&name) {
                return Err(DbManError::malformed(format!(
                    "duplicate field name '{}' in header",
                    name
                )));
            }
            set.names.push(name);
        }
        Ok(set)
    }

    /// Appends a name unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Whether the set contains `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no fields are present.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Field names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterates over field names in order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.names.iter()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

/// One flat row of named string values, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRecord {
    pairs: Vec<(String, String)>,
}

impl TabularRecord {
    /// Builds a record, rejecting repeated field names.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut record = Self::default();
        for (name, value) in pairs {
            if record.get(&name).is_some() {
                return Err(DbManError::malformed(format!(
                    "duplicate field '{}' in record",
                    name
                )));
            }
            record.pairs.push((name, value));
        }
        Ok(record)
    }

    /// Zips a field set with positional values of the same length.
    pub fn from_values(fields: &FieldSet, values: Vec<String>) -> Result<Self> {
        if fields.len() != values.len() {
            return Err(DbManError::malformed(format!(
                "expected {} values, found {}",
                fields.len(),
                values.len()
            )));
        }
        Ok(Self {
            pairs: fields.iter().cloned().zip(values).collect(),
        })
    }

    /// Value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Values laid out in `fields` order; missing fields render as "".
    pub fn values_for(&self, fields: &FieldSet) -> Vec<String> {
        fields
            .iter()
            .map(|name| self.get(name).unwrap_or_default().to_string())
            .collect()
    }

    /// Field/value pairs in record order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Positional values in record order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, v)| v.as_str())
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Tabular raw-query result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// What a raw query produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutput {
    /// Column names plus rows of rendered values
    Table(QueryResult),
    /// Opaque printable records (documents, command replies)
    Records(Vec<String>),
}

impl QueryOutput {
    /// Number of rows or records produced.
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Table(result) => result.rows.len(),
            QueryOutput::Records(records) => records.len(),
        }
    }

    /// True when the query produced nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One entry of a structure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    pub sample: Option<String>,
    pub declared_type: Option<String>,
}

impl FieldDescription {
    /// Describes a field with a display-truncated sample.
    pub fn sampled(
        name: impl Into<String>,
        sample: Option<&str>,
        declared_type: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sample: sample.map(truncate_sample),
            declared_type,
        }
    }
}

/// Outcome of describing a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureDescription {
    Fields(Vec<FieldDescription>),
    /// Container missing or holding no data
    NoData,
}

impl StructureDescription {
    /// Number of described fields, `None` for "no data".
    pub fn field_count(&self) -> Option<usize> {
        match self {
            StructureDescription::Fields(fields) => Some(fields.len()),
            StructureDescription::NoData => None,
        }
    }
}

/// Structure of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureReport {
    pub container: String,
    pub description: StructureDescription,
}

impl StructureReport {
    /// Report for a container that exists and has fields.
    pub fn fields(container: impl Into<String>, fields: Vec<FieldDescription>) -> Self {
        Self {
            container: container.into(),
            description: StructureDescription::Fields(fields),
        }
    }

    /// Explicit "no data" report.
    pub fn no_data(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            description: StructureDescription::NoData,
        }
    }

    /// Field names in report order, empty for "no data".
    pub fn field_names(&self) -> Vec<&str> {
        match &self.description {
            StructureDescription::Fields(fields) => {
                fields.iter().map(|f| f.name.as_str()).collect()
            }
            StructureDescription::NoData => Vec::new(),
        }
    }
}

/// A single item that failed inside a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item: String,
    pub message: String,
}

impl ItemFailure {
    /// Creates a failure entry.
    pub fn new(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.item, self.message)
    }
}

/// Summary of a batch operation (import, wipe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation: String,
    pub container: Option<String>,
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
}

impl OperationReport {
    /// Starts an empty report.
    pub fn new(operation: impl Into<String>, container: Option<String>) -> Self {
        Self {
            operation: operation.into(),
            container,
            succeeded: 0,
            failures: Vec::new(),
        }
    }

    /// Counts one successful item.
    pub fn record_success(&mut self) {
        self.succeeded = self.succeeded.saturating_add(1);
    }

    /// Records one failed item.
    pub fn record_failure(&mut self, item: impl Into<String>, message: impl Into<String>) {
        self.failures.push(ItemFailure::new(item, message));
    }

    /// True when no item failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turns a report with failures into [`DbManError::PartialFailure`].
    pub fn ensure_complete(self) -> Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(DbManError::PartialFailure {
                operation: self.operation,
                succeeded: self.succeeded,
                failures: self.failures,
            })
        }
    }
}

/// Summary of a CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub container: String,
    pub path: PathBuf,
    pub field_set: FieldSet,
    pub rows_written: usize,
}

/// Shortens a value for display: first 17 characters plus `...` past 20.
pub fn truncate_sample(value: &str) -> String {
    let keep = SAMPLE_DISPLAY_WIDTH.saturating_sub(3);
    if value.chars().count() > SAMPLE_DISPLAY_WIDTH {
        let mut out: String = value.chars().take(keep).collect();
        out.push_str("...");
        out
    } else {
        value.to_string()
    }
}
