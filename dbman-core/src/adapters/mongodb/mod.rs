//! MongoDB document adapter.
//!
//! # Module Structure
//! - `values`: BSON rendering and document/record conversion
//!
//! # Field inference
//! Collections have no declared fields. Export samples the first
//! [`SAMPLE_BOUND`] documents in natural order, takes the union of their
//! top-level keys without `_id`, and freezes that as the header. Keys that
//! only appear in later documents are not exported.
//!
//! # Raw queries
//! Query text is a database command in extended JSON, for example
//! `{"find": "users", "filter": {"age": "30"}}`. Cursor replies yield the
//! documents of the first batch; any other reply is returned whole.

mod values;

#[cfg(test)]
mod tests;

use super::{DataStoreAdapter, WipeConfirmation};
use crate::Result;
use crate::codec::{self, data_line_number};
use crate::config::ConnectionProfile;
use crate::error::{DbManError, redact_database_url};
use crate::inference::{FieldSetInferrer, SAMPLE_BOUND};
use crate::models::{
    Engine, ExportSummary, FieldDescription, FieldSet, OperationReport, QueryOutput,
    StructureReport,
};
use crate::validation::{container_name_from_path, validate_collection_name};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Cursor, Database};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

pub use values::{bson_to_string, bson_type_name, document_to_json, project_document};

/// Database used when neither the profile nor the URL names one.
pub const DEFAULT_DATABASE: &str = "test";

/// Server error code for "collection already exists".
const NAMESPACE_EXISTS: i32 = 48;

/// MongoDB adapter bound to one database.
pub struct MongoAdapter {
    client: Client,
    database: String,
    label: String,
    closed: AtomicBool,
}

impl std::fmt::Debug for MongoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoAdapter")
            .field("database", &self.database)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Maps a driver error: unreachable servers become `Connection`, server
/// command failures keep the server's message.
fn map_mongo_error(context: impl Into<String>, error: mongodb::error::Error) -> DbManError {
    let unreachable = matches!(
        error.kind.as_ref(),
        ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
    );
    if unreachable {
        return DbManError::connection_failed(context, error);
    }
    if let ErrorKind::Command(command) = error.kind.as_ref() {
        return DbManError::query(&command.message);
    }
    DbManError::query(error)
}

impl MongoAdapter {
    /// Creates the adapter. The driver connects in the background on first use.
    ///
    /// # Errors
    /// `Connection` when the URL cannot be parsed or resolved.
    pub async fn connect(profile: &ConnectionProfile) -> Result<Self> {
        let url = profile.connection_url()?;
        let mut options = ClientOptions::parse(url.as_str()).await.map_err(|e| {
            DbManError::connection_failed(
                format!(
                    "Invalid MongoDB connection settings for {}",
                    redact_database_url(&url)
                ),
                e,
            )
        })?;

        if options.max_pool_size.is_none() {
            options.max_pool_size = Some(profile.max_connections());
        }
        options.app_name = Some("dbman".to_string());

        let database = profile
            .database()
            .map(str::to_string)
            .or_else(|| options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(options).map_err(|e| {
            DbManError::connection_failed(
                format!(
                    "Failed to create MongoDB client for {}",
                    redact_database_url(&url)
                ),
                e,
            )
        })?;

        tracing::debug!(
            "Created MongoDB client for profile '{}' (database '{}')",
            profile.label(),
            database
        );

        Ok(Self {
            client,
            database,
            label: profile.label().to_string(),
            closed: AtomicBool::new(false),
        })
    }

    /// Name of the database this adapter works in.
    pub fn database_name(&self) -> &str {
        &self.database
    }

    fn db(&self) -> Database {
        self.client.database(&self.database)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db().collection::<Document>(name)
    }

    /// User collection names, sorted; `system.*` collections are skipped.
    async fn collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .db()
            .list_collection_names()
            .await
            .map_err(|e| {
                map_mongo_error(
                    format!("Failed to list collections in '{}'", self.database),
                    e,
                )
            })?
            .into_iter()
            .filter(|n| !n.starts_with("system."))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collection_names().await?.iter().any(|n| n == name))
    }

    async fn drain_cursor(
        &self,
        collection: &str,
        mut cursor: Cursor<Document>,
        mut visit: impl FnMut(Document) -> bool,
    ) -> Result<()> {
        while let Some(doc) = cursor.try_next().await.map_err(|e| {
            map_mongo_error(format!("Failed to iterate cursor for '{}'", collection), e)
        })? {
            if !visit(doc) {
                break;
            }
        }
        Ok(())
    }

    async fn find_all(&self, collection: &str, limit: Option<i64>) -> Result<Cursor<Document>> {
        let options = FindOptions::builder().limit(limit).build();
        self.collection(collection)
            .find(doc! {})
            .with_options(options)
            .await
            .map_err(|e| map_mongo_error(format!("Failed to read '{}'", collection), e))
    }

    async fn infer_fields(&self, collection: &str) -> Result<FieldSet> {
        let bound = i64::try_from(SAMPLE_BOUND).unwrap_or(i64::MAX);
        let cursor = self.find_all(collection, Some(bound)).await?;
        let mut inferrer = FieldSetInferrer::new().excluding("_id");
        self.drain_cursor(collection, cursor, |doc| {
            inferrer.observe(doc.keys().map(String::as_str))
        })
        .await?;
        Ok(inferrer.freeze())
    }

    async fn import_documents(
        &self,
        path: &Path,
        container: Option<&str>,
    ) -> Result<OperationReport> {
        let name = match container {
            Some(name) => name.to_string(),
            None => container_name_from_path(path)?,
        };
        validate_collection_name(&name)?;
        let csv = codec::read_csv_file(path).await?;
        let collection = self.collection(&name);
        let mut report = OperationReport::new("import", Some(name.clone()));

        for index in 0..csv.len() {
            let line = data_line_number(index);
            let record = match csv.record_at(index) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Line {} of {} skipped: {}", line, path.display(), e);
                    report.record_failure(format!("line {}", line), e.to_string());
                    continue;
                }
            };
            match collection
                .insert_one(values::record_to_document(&record))
                .await
            {
                Ok(_) => report.record_success(),
                Err(e) => match map_mongo_error(format!("Import into '{}' failed", name), e) {
                    err @ DbManError::Connection { .. } => return Err(err),
                    err => {
                        tracing::warn!("Line {} of {} not imported: {}", line, path.display(), err);
                        report.record_failure(format!("line {}", line), err.to_string());
                    }
                },
            }
        }

        tracing::info!(
            "Imported {} documents into '{}' ({} failed)",
            report.succeeded,
            name,
            report.failures.len()
        );
        Ok(report)
    }

    async fn export_documents(&self, name: &str, out_path: &Path) -> Result<ExportSummary> {
        validate_collection_name(name)?;
        if !self.collection_exists(name).await? {
            return Err(DbManError::not_found("Collection", name));
        }

        let field_set = self.infer_fields(name).await?;
        let cursor = self.find_all(name, None).await?;
        let mut rows: Vec<Vec<String>> = Vec::new();
        self.drain_cursor(name, cursor, |doc| {
            rows.push(project_document(&doc, &field_set));
            true
        })
        .await?;

        codec::write_csv_file(out_path, &codec::encode_rows(&field_set, &rows)).await?;
        tracing::info!(
            "Exported {} documents from '{}' to {} ({} fields)",
            rows.len(),
            name,
            out_path.display(),
            field_set.len()
        );

        Ok(ExportSummary {
            container: name.to_string(),
            path: out_path.to_path_buf(),
            field_set,
            rows_written: rows.len(),
        })
    }

    async fn run_command_text(&self, query: &str) -> Result<QueryOutput> {
        let text = query.trim();
        if text.is_empty() {
            return Err(DbManError::malformed("query text is empty"));
        }
        let json: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            DbManError::malformed(format!("query must be a JSON command document: {}", e))
        })?;
        let command = match Bson::try_from(json) {
            Ok(Bson::Document(command)) => command,
            Ok(_) => {
                return Err(DbManError::malformed(
                    "query must be a JSON object such as {\"find\": \"users\"}",
                ));
            }
            Err(e) => {
                return Err(DbManError::malformed(format!(
                    "invalid extended JSON: {}",
                    e
                )));
            }
        };
        tracing::debug!("Running command on '{}': {}", self.database, text);

        let reply = self
            .db()
            .run_command(command)
            .await
            .map_err(|e| map_mongo_error(format!("Command on '{}' failed", self.database), e))?;

        let batch = reply
            .get_document("cursor")
            .ok()
            .and_then(|cursor| cursor.get_array("firstBatch").ok());
        let records = match batch {
            Some(batch) => batch
                .iter()
                .map(|item| match item {
                    Bson::Document(doc) => document_to_json(doc),
                    other => bson_to_string(other),
                })
                .collect(),
            None => vec![document_to_json(&reply)],
        };
        Ok(QueryOutput::Records(records))
    }
}

#[async_trait]
impl DataStoreAdapter for MongoAdapter {
    fn engine(&self) -> Engine {
        Engine::MongoDb
    }

    async fn ping(&self) -> Result<()> {
        self.db()
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                DbManError::connection_failed(
                    format!("MongoDB profile '{}' is not reachable", self.label),
                    e,
                )
            })?;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        self.collection_names().await
    }

    async fn create_container(&self, name: &str, _columns: Option<&FieldSet>) -> Result<()> {
        validate_collection_name(name)?;
        if self.collection_exists(name).await? {
            tracing::debug!("Collection '{}' already exists", name);
            return Ok(());
        }
        match self.db().create_collection(name).await {
            Ok(()) => {
                tracing::info!("Created collection '{}'", name);
                Ok(())
            }
            Err(e)
                if matches!(
                    e.kind.as_ref(),
                    ErrorKind::Command(command) if command.code == NAMESPACE_EXISTS
                ) =>
            {
                Ok(())
            }
            Err(e) => Err(map_mongo_error(
                format!("Failed to create collection '{}'", name),
                e,
            )),
        }
    }

    async fn import_csv(&self, path: &Path, container: Option<&str>) -> Result<OperationReport> {
        self.import_documents(path, container).await
    }

    async fn export_csv(&self, container: &str, out_path: &Path) -> Result<ExportSummary> {
        self.export_documents(container, out_path).await
    }

    async fn delete_all_containers(
        &self,
        _confirmation: WipeConfirmation,
    ) -> Result<OperationReport> {
        let names = self.collection_names().await?;
        let mut report = OperationReport::new("wipe", None);
        for name in &names {
            match self.collection(name).drop().await {
                Ok(()) => report.record_success(),
                Err(e) => {
                    let err = map_mongo_error(format!("Dropping '{}' failed", name), e);
                    tracing::warn!("Failed to drop collection '{}': {}", name, err);
                    report.record_failure(name.clone(), err.to_string());
                }
            }
        }
        tracing::info!(
            "Dropped {} of {} collections in '{}'",
            report.succeeded,
            names.len(),
            self.database
        );
        Ok(report)
    }

    async fn describe_structure(&self, container: &str) -> Result<StructureReport> {
        validate_collection_name(container)?;
        let first = self
            .collection(container)
            .find_one(doc! {})
            .await
            .map_err(|e| map_mongo_error(format!("Failed to read '{}'", container), e))?;

        Ok(match first {
            Some(doc) => StructureReport::fields(
                container,
                doc.iter()
                    .map(|(name, value)| {
                        FieldDescription::sampled(
                            name.clone(),
                            Some(&bson_to_string(value)),
                            Some(bson_type_name(value).to_string()),
                        )
                    })
                    .collect(),
            ),
            None => StructureReport::no_data(container),
        })
    }

    async fn execute_raw_query(&self, query: &str) -> Result<QueryOutput> {
        self.run_command_text(query).await
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.client.clone().shutdown().await;
            tracing::debug!("Closed MongoDB client for profile '{}'", self.label);
        }
    }
}
