//! Neo4j graph adapter.
//!
//! # Module Structure
//! - `cypher`: statement text
//! - `values`: rendering of decoded property values
//!
//! # Containers
//! A container is a node label. Graph stores have no empty label, so
//! creating one only validates the name; the label appears once a node
//! carries it.
//!
//! # Field inference
//! Export takes the union of property keys over the first
//! [`SAMPLE_BOUND`](crate::inference::SAMPLE_BOUND) nodes under the label, in
//! first-seen order, and writes every node against that header. Properties
//! that only appear on later nodes are not exported.
//!
//! # Raw queries
//! Cypher text runs unmodified. Each record becomes a row, its keys the
//! columns. Values are decoded through serde, so temporal and spatial types
//! fail with the driver's message; return them with `toString()`.

mod cypher;
mod values;

use super::{DataStoreAdapter, WipeConfirmation};
use crate::Result;
use crate::codec::{self, data_line_number};
use crate::config::ConnectionProfile;
use crate::error::{DbManError, redact_database_url};
use crate::inference::FieldSetInferrer;
use crate::models::{
    Engine, ExportSummary, FieldDescription, FieldSet, OperationReport, QueryOutput, QueryResult,
    StructureReport,
};
use crate::validation::{container_name_from_path, validate_identifier};
use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query, Row, query};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

pub use values::{value_to_string, value_type_name};

/// Username used when the profile names none.
pub const DEFAULT_USER: &str = "neo4j";

/// Neo4j adapter over a Bolt connection pool.
///
/// `close` takes the pool out of the adapter, so its connections are
/// released once in-flight operations finish.
pub struct Neo4jAdapter {
    graph: Mutex<Option<Graph>>,
    label: String,
}

impl std::fmt::Debug for Neo4jAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jAdapter")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Maps a driver error: transport and authentication failures become
/// `Connection`, everything else keeps the server's message.
fn map_neo4j_error(context: impl Into<String>, error: neo4rs::Error) -> DbManError {
    let unreachable = matches!(
        error,
        neo4rs::Error::IOError { .. }
            | neo4rs::Error::ConnectionError
            | neo4rs::Error::AuthenticationError(_)
    );
    if unreachable {
        DbManError::connection_failed(context, error)
    } else {
        DbManError::query(error)
    }
}

fn decode_error(column: &str, error: &neo4rs::DeError) -> DbManError {
    DbManError::query(format!("cannot decode column '{}': {}", column, error))
}

impl Neo4jAdapter {
    /// Builds the connection pool.
    ///
    /// # Errors
    /// `Connection` when the driver rejects the settings or cannot reach
    /// the server.
    pub async fn connect(profile: &ConnectionProfile) -> Result<Self> {
        let url = profile.connection_url()?;
        let credentials = profile.credentials();
        let user = if credentials.username().is_empty() {
            DEFAULT_USER
        } else {
            credentials.username()
        };

        let mut builder = ConfigBuilder::default()
            .uri(url.as_str())
            .user(user)
            .password(credentials.password().unwrap_or_default())
            .max_connections(usize::try_from(profile.max_connections()).unwrap_or(1));
        if let Some(database) = profile.database() {
            builder = builder.db(database);
        }
        let config = builder.build().map_err(|e| {
            DbManError::connection_failed(
                format!("Invalid Neo4j settings for {}", redact_database_url(&url)),
                e,
            )
        })?;

        let graph = Graph::connect(config).await.map_err(|e| {
            DbManError::connection_failed(
                format!("Failed to connect to Neo4j at {}", redact_database_url(&url)),
                e,
            )
        })?;

        tracing::debug!("Created Neo4j pool for profile '{}'", profile.label());
        Ok(Self {
            graph: Mutex::new(Some(graph)),
            label: profile.label().to_string(),
        })
    }

    fn is_closed(&self) -> bool {
        self.graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Pool handle for one operation; `Graph` clones share the pool.
    fn graph(&self) -> Result<Graph> {
        self.graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                DbManError::connection_failed(
                    format!("Neo4j profile '{}'", self.label),
                    std::io::Error::new(std::io::ErrorKind::NotConnected, "adapter is closed"),
                )
            })
    }

    async fn fetch_rows(&self, statement: Query, context: &str) -> Result<Vec<Row>> {
        let mut stream = self
            .graph()?
            .execute(statement)
            .await
            .map_err(|e| map_neo4j_error(context, e))?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(|e| map_neo4j_error(context, e))? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn labels(&self) -> Result<Vec<String>> {
        let rows = self
            .fetch_rows(query(cypher::LIST_LABELS), "Failed to list labels")
            .await?;
        rows.iter()
            .map(|row| {
                row.get::<String>("label")
                    .map_err(|e| decode_error("label", &e))
            })
            .collect()
    }

    async fn infer_fields(&self, label: &str) -> Result<FieldSet> {
        let rows = self
            .fetch_rows(
                query(&cypher::sample_keys(label)),
                &format!("Failed to sample '{}'", label),
            )
            .await?;
        let mut inferrer = FieldSetInferrer::new();
        for row in &rows {
            let keys: Vec<String> = row.get("keys").map_err(|e| decode_error("keys", &e))?;
            if !inferrer.observe(keys.iter().map(String::as_str)) {
                break;
            }
        }
        Ok(inferrer.freeze())
    }

    async fn import_nodes(&self, path: &Path, container: Option<&str>) -> Result<OperationReport> {
        let label = match container {
            Some(name) => name.to_string(),
            None => container_name_from_path(path)?,
        };
        validate_identifier(&label)?;
        let csv = codec::read_csv_file(path).await?;
        for name in &csv.header {
            validate_identifier(name)?;
        }
        // Nothing is written unless every row is well-formed.
        let records = csv.strict_records()?;
        let statement = cypher::create_node(&label, &csv.header);
        let graph = self.graph()?;
        let mut report = OperationReport::new("import", Some(label.clone()));
        tracing::debug!("Import statement: {}", statement);

        for (index, record) in records.iter().enumerate() {
            let line = data_line_number(index);
            let mut node = query(&statement);
            for (i, value) in record.values().enumerate() {
                node = node.param(&cypher::param_name(i), value);
            }
            match graph.run(node).await {
                Ok(()) => report.record_success(),
                Err(e) => match map_neo4j_error(format!("Import into '{}' failed", label), e) {
                    err @ DbManError::Connection { .. } => return Err(err),
                    err => {
                        tracing::warn!("Line {} of {} not imported: {}", line, path.display(), err);
                        report.record_failure(format!("line {}", line), err.to_string());
                    }
                },
            }
        }

        tracing::info!(
            "Imported {} nodes as '{}' ({} failed)",
            report.succeeded,
            label,
            report.failures.len()
        );
        Ok(report)
    }

    async fn export_nodes(&self, label: &str, out_path: &Path) -> Result<ExportSummary> {
        validate_identifier(label)?;
        if !self.labels().await?.iter().any(|l| l == label) {
            return Err(DbManError::not_found("Label", label));
        }

        let field_set = self.infer_fields(label).await?;
        let nodes = self
            .fetch_rows(
                query(&cypher::all_properties(label)),
                &format!("Failed to read '{}'", label),
            )
            .await?;
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let props: Map<String, Value> =
                node.get("props").map_err(|e| decode_error("props", &e))?;
            rows.push(
                field_set
                    .iter()
                    .map(|name| props.get(name).map(value_to_string).unwrap_or_default())
                    .collect(),
            );
        }

        codec::write_csv_file(out_path, &codec::encode_rows(&field_set, &rows)).await?;
        tracing::info!(
            "Exported {} nodes from '{}' to {} ({} fields)",
            rows.len(),
            label,
            out_path.display(),
            field_set.len()
        );

        Ok(ExportSummary {
            container: label.to_string(),
            path: out_path.to_path_buf(),
            field_set,
            rows_written: rows.len(),
        })
    }

    async fn run_cypher(&self, text: &str) -> Result<QueryOutput> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DbManError::malformed("query text is empty"));
        }
        tracing::debug!("Running Cypher: {}", text);
        let rows = self.fetch_rows(query(text), "Cypher query failed").await?;

        let mut columns: Vec<String> = Vec::new();
        let mut table = Vec::with_capacity(rows.len());
        for row in &rows {
            let record: Map<String, Value> =
                row.to().map_err(|e| decode_error("record", &e))?;
            if columns.is_empty() {
                columns = record.keys().cloned().collect();
            }
            table.push(
                columns
                    .iter()
                    .map(|c| record.get(c).map(value_to_string).unwrap_or_default())
                    .collect(),
            );
        }
        Ok(QueryOutput::Table(QueryResult {
            columns,
            rows: table,
        }))
    }
}

#[async_trait]
impl DataStoreAdapter for Neo4jAdapter {
    fn engine(&self) -> Engine {
        Engine::Neo4j
    }

    async fn ping(&self) -> Result<()> {
        let context = format!("Neo4j profile '{}' is not reachable", self.label);
        self.fetch_rows(query(cypher::PING), &context)
            .await
            .map_err(|e| match e {
                DbManError::Connection { .. } => e,
                other => DbManError::connection_failed(context.clone(), other),
            })?;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        self.labels().await
    }

    async fn create_container(&self, name: &str, _columns: Option<&FieldSet>) -> Result<()> {
        validate_identifier(name)?;
        tracing::debug!("Label '{}' needs no creation; it exists once a node carries it", name);
        Ok(())
    }

    async fn import_csv(&self, path: &Path, container: Option<&str>) -> Result<OperationReport> {
        self.import_nodes(path, container).await
    }

    async fn export_csv(&self, container: &str, out_path: &Path) -> Result<ExportSummary> {
        self.export_nodes(container, out_path).await
    }

    async fn delete_all_containers(
        &self,
        _confirmation: WipeConfirmation,
    ) -> Result<OperationReport> {
        let labels = self.labels().await?;
        let mut report = OperationReport::new("wipe", None);
        match self.graph()?.run(query(cypher::DETACH_DELETE_ALL)).await {
            Ok(()) => {
                for _ in &labels {
                    report.record_success();
                }
            }
            Err(e) => {
                let err = map_neo4j_error("Deleting all nodes failed", e);
                if err.is_connection() {
                    return Err(err);
                }
                tracing::warn!("Failed to delete nodes: {}", err);
                report.record_failure("all nodes", err.to_string());
            }
        }
        tracing::info!("Deleted all nodes and relationships ({} labels)", labels.len());
        Ok(report)
    }

    async fn describe_structure(&self, container: &str) -> Result<StructureReport> {
        validate_identifier(container)?;
        let rows = self
            .fetch_rows(
                query(&cypher::first_node(container)),
                &format!("Failed to read '{}'", container),
            )
            .await?;
        let Some(row) = rows.first() else {
            return Ok(StructureReport::no_data(container));
        };

        let keys: Vec<String> = row.get("keys").map_err(|e| decode_error("keys", &e))?;
        let props: Map<String, Value> = row.get("props").map_err(|e| decode_error("props", &e))?;
        let fields = values::ordered_keys(&keys, &props)
            .into_iter()
            .map(|name| {
                let value = props.get(name).unwrap_or(&Value::Null);
                FieldDescription::sampled(
                    name,
                    Some(&value_to_string(value)),
                    Some(value_type_name(value).to_string()),
                )
            })
            .collect();
        Ok(StructureReport::fields(container, fields))
    }

    async fn execute_raw_query(&self, query: &str) -> Result<QueryOutput> {
        self.run_cypher(query).await
    }

    async fn close(&self) {
        let released = self
            .graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            tracing::debug!("Closed Neo4j pool for profile '{}'", self.label);
        }
    }
}
