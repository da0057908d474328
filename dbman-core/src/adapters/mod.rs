//! Uniform operation contract and the factory that selects an adapter.
//!
//! Every store is driven through [`DataStoreAdapter`]. The concrete adapter
//! is chosen once, from the profile's engine, by [`open_adapter`]; after that
//! nothing branches on the backend kind again.
//!
//! # Adapter variants
//! - `sql`: relational tables (PostgreSQL, MySQL, SQLite)
//! - `mongodb`: document collections
//! - `neo4j`: labeled graph nodes
//! - `redis`: flat and structured key/value pairs

use crate::Result;
use crate::config::ConnectionProfile;
use crate::models::{
    BackendKind, Engine, ExportSummary, FieldSet, OperationReport, QueryOutput, StructureReport,
};
use async_trait::async_trait;
use std::path::Path;

#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub mod sql;

#[cfg(feature = "mongodb")]
pub mod mongodb;

#[cfg(feature = "neo4j")]
pub mod neo4j;

#[cfg(feature = "redis")]
pub mod redis;

/// Proof that the operator approved a destructive wipe.
///
/// The core never prompts. The caller obtains consent however it likes and
/// hands over this token; it cannot be built any other way.
///
/// # Example
/// ```rust
/// use dbman_core::adapters::WipeConfirmation;
///
/// assert!(WipeConfirmation::from_operator_reply(" Yes ").is_some());
/// assert!(WipeConfirmation::from_operator_reply("no").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipeConfirmation {
    _approved: (),
}

impl WipeConfirmation {
    /// Accepts `yes` or `y` in any case, surrounding whitespace ignored.
    pub fn from_operator_reply(reply: &str) -> Option<Self> {
        let reply = reply.trim();
        if reply.eq_ignore_ascii_case("yes") || reply.eq_ignore_ascii_case("y") {
            Some(Self { _approved: () })
        } else {
            None
        }
    }

    /// Confirmation given up front, e.g. through a `--yes` flag.
    pub fn pre_approved() -> Self {
        Self { _approved: () }
    }
}

/// The seven operations every backend supports.
///
/// Each call stands alone: no method assumes another was called first.
///
/// # Object Safety
/// This trait is object-safe and is used as `Box<dyn DataStoreAdapter>`.
#[async_trait]
pub trait DataStoreAdapter: Send + Sync {
    /// Engine behind this adapter.
    fn engine(&self) -> Engine;

    /// Data model behind this adapter.
    fn backend_kind(&self) -> BackendKind {
        self.engine().backend_kind()
    }

    /// Checks that the backend answers.
    async fn ping(&self) -> Result<()>;

    /// Lists tables, collections, labels or keys matching the configured pattern.
    async fn list_containers(&self) -> Result<Vec<String>>;

    /// Creates a container if it does not exist.
    ///
    /// `columns` is used by relational stores only.
    async fn create_container(&self, name: &str, columns: Option<&FieldSet>) -> Result<()>;

    /// Loads a CSV file.
    ///
    /// The container defaults to the file's base name. Rows already written
    /// are not rolled back when a later row fails; per-row failures are in
    /// the returned report.
    async fn import_csv(&self, path: &Path, container: Option<&str>) -> Result<OperationReport>;

    /// Writes a container to a CSV file at `out_path`.
    ///
    /// An empty container produces a header-only file.
    async fn export_csv(&self, container: &str, out_path: &Path) -> Result<ExportSummary>;

    /// Drops or empties every container.
    ///
    /// Failures on individual containers are recorded and the pass
    /// continues.
    async fn delete_all_containers(
        &self,
        confirmation: WipeConfirmation,
    ) -> Result<OperationReport>;

    /// Describes a container's fields with truncated samples.
    ///
    /// A missing or empty container yields a "no data" report.
    async fn describe_structure(&self, container: &str) -> Result<StructureReport>;

    /// Runs backend-native query text. Native errors are returned verbatim.
    async fn execute_raw_query(&self, query: &str) -> Result<QueryOutput>;

    /// Releases the connection. Safe to call more than once or on an
    /// adapter that was never used.
    async fn close(&self);
}

/// Opens the adapter for a profile.
///
/// Connections are established lazily where the driver allows it; call
/// [`DataStoreAdapter::ping`] to check reachability.
///
/// # Errors
/// `Configuration` for an invalid profile, `Unsupported` when the engine was
/// not compiled in, `Connection` when the driver rejects the settings.
pub async fn open_adapter(profile: &ConnectionProfile) -> Result<Box<dyn DataStoreAdapter>> {
    profile.validate()?;
    tracing::debug!("Opening adapter for profile {}", profile);

    match profile.engine() {
        #[cfg(feature = "postgresql")]
        Engine::PostgreSql => Ok(Box::new(
            sql::SqlAdapter::connect(profile, sql::SqlDialect::Postgres).await?,
        )),
        #[cfg(feature = "mysql")]
        Engine::MySql => Ok(Box::new(
            sql::SqlAdapter::connect(profile, sql::SqlDialect::MySql).await?,
        )),
        #[cfg(feature = "sqlite")]
        Engine::Sqlite => Ok(Box::new(
            sql::SqlAdapter::connect(profile, sql::SqlDialect::Sqlite).await?,
        )),
        #[cfg(feature = "mongodb")]
        Engine::MongoDb => Ok(Box::new(mongodb::MongoAdapter::connect(profile).await?)),
        #[cfg(feature = "neo4j")]
        Engine::Neo4j => Ok(Box::new(neo4j::Neo4jAdapter::connect(profile).await?)),
        #[cfg(feature = "redis")]
        Engine::Redis => Ok(Box::new(redis::RedisAdapter::connect(profile).await?)),
        #[allow(unreachable_patterns)]
        other => Err(crate::error::DbManError::unsupported(
            format!("{} adapter", other),
            format!("this build (compile with the {} feature)", feature_name(other)),
        )),
    }
}

/// Cargo feature that enables an engine.
pub fn feature_name(engine: Engine) -> &'static str {
    match engine {
        Engine::PostgreSql => "postgresql",
        Engine::MySql => "mysql",
        Engine::Sqlite => "sqlite",
        Engine::MongoDb => "mongodb",
        Engine::Neo4j => "neo4j",
        Engine::Redis => "redis",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_accepts_yes_variants() {
        for reply in ["yes", "YES", "y", "Y", "  yes\n"] {
            assert!(
                WipeConfirmation::from_operator_reply(reply).is_some(),
                "{:?} should confirm",
                reply
            );
        }
    }

    #[test]
    fn test_confirmation_rejects_everything_else() {
        for reply in ["", "no", "n", "yess", "ok", "sure"] {
            assert!(WipeConfirmation::from_operator_reply(reply).is_none());
        }
    }

    #[test]
    fn test_adapter_trait_is_object_safe() {
        fn assert_object_safe(_: Option<Box<dyn DataStoreAdapter>>) {}
        assert_object_safe(None);
    }

    #[tokio::test]
    async fn test_open_adapter_rejects_invalid_profile() {
        let profile = ConnectionProfile::new("bad", Engine::Sqlite);
        let result = open_adapter(&profile).await;
        assert!(matches!(
            result,
            Err(crate::error::DbManError::Configuration { .. })
        ));
    }

    #[test]
    fn test_feature_names() {
        assert_eq!(feature_name(Engine::PostgreSql), "postgresql");
        assert_eq!(feature_name(Engine::Neo4j), "neo4j");
    }
}
