//! Redis key-value adapter.
//!
//! # Module Structure
//! - `commands`: raw command tokenizing and the allow-list
//! - `render`: key contents and reply rendering
//!
//! # Containers
//! Redis has no containers. Listing returns the keys matching the
//! profile's key pattern, and the container given to export is itself a
//! glob. Creating a container sets the key to an empty string when it does
//! not exist yet.
//!
//! # CSV
//! Import skips the header line and reads each row positionally: the first
//! column is the key, the second the value, extra columns are ignored.
//! Export writes `key,value` with one row per matching key; keys holding a
//! collection are written as JSON.
//!
//! # Wipe
//! `FLUSHDB` on the logical database of the connection. Other databases on
//! the same server are untouched.

mod commands;
mod render;

use super::{DataStoreAdapter, WipeConfirmation};
use crate::Result;
use crate::codec::{self, data_line_number};
use crate::config::ConnectionProfile;
use crate::error::{DbManError, redact_database_url};
use crate::models::{
    Engine, ExportSummary, FieldSet, OperationReport, QueryOutput, StructureReport,
};
use crate::validation::validate_key;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

pub use commands::{ALLOWED_COMMANDS, ParsedCommand, parse_command, tokenize};
pub use render::{KeyContents, ValueKind, reply_to_records};

/// Redis adapter over a multiplexed, auto-reconnecting connection.
///
/// `close` takes the manager out of the adapter; the connection drops once
/// in-flight operations release their clones.
pub struct RedisAdapter {
    connection: Mutex<Option<ConnectionManager>>,
    key_pattern: String,
    label: String,
}

impl std::fmt::Debug for RedisAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisAdapter")
            .field("key_pattern", &self.key_pattern)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

fn map_redis_error(context: impl Into<String>, error: RedisError) -> DbManError {
    if error.is_io_error()
        || error.is_connection_refusal()
        || error.is_connection_dropped()
        || error.is_timeout()
    {
        DbManError::connection_failed(context, error)
    } else {
        DbManError::query(error)
    }
}

impl RedisAdapter {
    /// Opens the client and its connection manager.
    ///
    /// # Errors
    /// `Connection` when the URL is invalid or the server cannot be reached.
    pub async fn connect(profile: &ConnectionProfile) -> Result<Self> {
        let url = profile.connection_url()?;
        let client = redis::Client::open(url.as_str()).map_err(|e| {
            DbManError::connection_failed(
                format!("Invalid Redis settings for {}", redact_database_url(&url)),
                e,
            )
        })?;
        let connection = ConnectionManager::new(client).await.map_err(|e| {
            DbManError::connection_failed(
                format!("Failed to connect to Redis at {}", redact_database_url(&url)),
                e,
            )
        })?;

        tracing::debug!("Connected to Redis for profile '{}'", profile.label());
        Ok(Self {
            connection: Mutex::new(Some(connection)),
            key_pattern: profile.key_pattern().to_string(),
            label: profile.label().to_string(),
        })
    }

    /// Handle for one operation; the manager is cheap to clone.
    fn conn(&self) -> Result<ConnectionManager> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                DbManError::connection_failed(
                    format!("Redis profile '{}'", self.label),
                    std::io::Error::new(std::io::ErrorKind::NotConnected, "adapter is closed"),
                )
            })
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn()?;
        let mut keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| map_redis_error(format!("Failed to list keys matching '{}'", pattern), e))?;
        keys.sort();
        Ok(keys)
    }

    /// Reads a key according to its type; `None` when the key does not
    /// exist or holds a type without a rendering.
    async fn read_key(&self, key: &str) -> Result<Option<KeyContents>> {
        let mut conn = self.conn()?;
        let context = || format!("Failed to read key '{}'", key);
        let key_type: String = redis::cmd("TYPE")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error(context(), e))?;

        let Some(kind) = ValueKind::from_type(&key_type) else {
            if key_type != "none" {
                tracing::debug!("Key '{}' has unsupported type '{}'", key, key_type);
            }
            return Ok(None);
        };

        let contents = match kind {
            ValueKind::Scalar => KeyContents::Scalar(
                conn.get(key)
                    .await
                    .map_err(|e| map_redis_error(context(), e))?,
            ),
            ValueKind::List => KeyContents::List(
                conn.lrange(key, 0, -1)
                    .await
                    .map_err(|e| map_redis_error(context(), e))?,
            ),
            ValueKind::Set => {
                let mut members: Vec<String> = conn
                    .smembers(key)
                    .await
                    .map_err(|e| map_redis_error(context(), e))?;
                members.sort();
                KeyContents::Set(members)
            }
            ValueKind::OrderedSet => KeyContents::OrderedSet(
                conn.zrange_withscores(key, 0, -1)
                    .await
                    .map_err(|e| map_redis_error(context(), e))?,
            ),
            ValueKind::Mapping => {
                let mut fields: Vec<(String, String)> = conn
                    .hgetall(key)
                    .await
                    .map_err(|e| map_redis_error(context(), e))?;
                fields.sort();
                KeyContents::Mapping(fields)
            }
        };
        Ok(Some(contents))
    }

    async fn import_pairs(&self, path: &Path, container: Option<&str>) -> Result<OperationReport> {
        if let Some(name) = container {
            tracing::debug!("Container '{}' ignored; keys come from the file", name);
        }
        let lines = codec::read_csv_lines(path).await?;
        let mut conn = self.conn()?;
        let mut report = OperationReport::new("import", None);

        // First line is the header.
        for (index, cells) in lines.iter().enumerate().skip(1) {
            let line = data_line_number(index.saturating_sub(1));
            if cells.len() == 1 && cells[0].is_empty() {
                continue;
            }
            let (Some(key), Some(value)) = (cells.first(), cells.get(1)) else {
                let message = format!("expected at least 2 columns, found {}", cells.len());
                tracing::warn!("Line {} of {} skipped: {}", line, path.display(), message);
                report.record_failure(format!("line {}", line), message);
                continue;
            };
            if let Err(e) = validate_key(key) {
                report.record_failure(format!("line {}", line), e.to_string());
                continue;
            }
            match conn.set::<_, _, ()>(key, value).await {
                Ok(()) => report.record_success(),
                Err(e) => match map_redis_error(format!("Import of key '{}' failed", key), e) {
                    err @ DbManError::Connection { .. } => return Err(err),
                    err => {
                        tracing::warn!("Line {} of {} not imported: {}", line, path.display(), err);
                        report.record_failure(format!("line {}", line), err.to_string());
                    }
                },
            }
        }

        tracing::info!(
            "Imported {} keys from {} ({} failed)",
            report.succeeded,
            path.display(),
            report.failures.len()
        );
        Ok(report)
    }

    async fn export_pairs(&self, pattern: &str, out_path: &Path) -> Result<ExportSummary> {
        validate_key(pattern)?;
        let field_set = FieldSet::from_header(["key", "value"])?;
        let mut rows: Vec<Vec<String>> = Vec::new();
        for key in self.keys_matching(pattern).await? {
            // Keys can expire between KEYS and the read.
            if let Some(contents) = self.read_key(&key).await? {
                rows.push(vec![key, contents.render()]);
            }
        }

        codec::write_csv_file(out_path, &codec::encode_rows(&field_set, &rows)).await?;
        tracing::info!(
            "Exported {} keys matching '{}' to {}",
            rows.len(),
            pattern,
            out_path.display()
        );

        Ok(ExportSummary {
            container: pattern.to_string(),
            path: out_path.to_path_buf(),
            field_set,
            rows_written: rows.len(),
        })
    }

    async fn run_command(&self, text: &str) -> Result<QueryOutput> {
        let command = parse_command(text)?;
        tracing::debug!("Running Redis command {} ({} args)", command.name, command.args.len());
        let mut conn = self.conn()?;
        let reply: redis::Value = redis::cmd(&command.name)
            .arg(&command.args)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error(format!("Command {} failed", command.name), e))?;
        Ok(QueryOutput::Records(reply_to_records(&reply)))
    }
}

#[async_trait]
impl DataStoreAdapter for RedisAdapter {
    fn engine(&self) -> Engine {
        Engine::Redis
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await.map_err(|e| {
            DbManError::connection_failed(
                format!("Redis profile '{}' is not reachable", self.label),
                e,
            )
        })?;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        self.keys_matching(&self.key_pattern).await
    }

    async fn create_container(&self, name: &str, _columns: Option<&FieldSet>) -> Result<()> {
        validate_key(name)?;
        let mut conn = self.conn()?;
        let created: bool = conn
            .set_nx(name, "")
            .await
            .map_err(|e| map_redis_error(format!("Failed to create key '{}'", name), e))?;
        if created {
            tracing::info!("Created key '{}'", name);
        } else {
            tracing::debug!("Key '{}' already exists", name);
        }
        Ok(())
    }

    async fn import_csv(&self, path: &Path, container: Option<&str>) -> Result<OperationReport> {
        self.import_pairs(path, container).await
    }

    async fn export_csv(&self, container: &str, out_path: &Path) -> Result<ExportSummary> {
        self.export_pairs(container, out_path).await
    }

    async fn delete_all_containers(
        &self,
        _confirmation: WipeConfirmation,
    ) -> Result<OperationReport> {
        let mut conn = self.conn()?;
        let size: usize = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("Failed to count keys", e))?;
        let mut report = OperationReport::new("wipe", None);
        match redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await {
            Ok(()) => report.succeeded = size,
            Err(e) => {
                let err = map_redis_error("FLUSHDB failed", e);
                if err.is_connection() {
                    return Err(err);
                }
                tracing::warn!("Failed to flush database: {}", err);
                report.record_failure("current database", err.to_string());
            }
        }
        tracing::info!("Flushed {} keys for profile '{}'", report.succeeded, self.label);
        Ok(report)
    }

    async fn describe_structure(&self, container: &str) -> Result<StructureReport> {
        validate_key(container)?;
        Ok(match self.read_key(container).await? {
            Some(contents) => StructureReport::fields(container, contents.describe()),
            None => StructureReport::no_data(container),
        })
    }

    async fn execute_raw_query(&self, query: &str) -> Result<QueryOutput> {
        self.run_command(query).await
    }

    async fn close(&self) {
        let released = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            tracing::debug!("Closed Redis connection for profile '{}'", self.label);
        }
    }
}
