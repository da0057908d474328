//! Pool management for the relational adapter.

use super::{SqlAdapter, SqlDialect};
use crate::Result;
use crate::config::ConnectionProfile;
use crate::error::{DbManError, redact_database_url};
use sqlx::any::AnyPoolOptions;
use std::sync::atomic::{AtomicBool, Ordering};

impl SqlAdapter {
    /// Creates the adapter with a lazily connecting pool.
    ///
    /// No connection is made until the first operation; use
    /// [`ping`](crate::adapters::DataStoreAdapter::ping) to check
    /// reachability.
    ///
    /// # Errors
    /// `Connection` when the driver rejects the URL, `Configuration` when
    /// the profile is invalid.
    pub async fn connect(profile: &ConnectionProfile, dialect: SqlDialect) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let url = profile.connection_url()?;
        let pool = AnyPoolOptions::new()
            .max_connections(profile.max_connections())
            .test_before_acquire(true)
            .connect_lazy(&url)
            .map_err(|e| {
                DbManError::connection_failed(
                    format!(
                        "Failed to create {} connection pool to {}",
                        dialect,
                        redact_database_url(&url)
                    ),
                    e,
                )
            })?;

        tracing::debug!(
            "Created {} pool for profile '{}' (max {} connections)",
            dialect,
            profile.label(),
            profile.max_connections()
        );

        Ok(Self {
            pool,
            dialect,
            label: profile.label().to_string(),
            closed: AtomicBool::new(false),
        })
    }

    pub(super) async fn ping_internal(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DbManError::connection_failed(
                    format!("{} profile '{}' is not reachable", self.dialect, self.label),
                    e,
                )
            })?;
        Ok(())
    }

    pub(super) async fn close_internal(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.pool.close().await;
            tracing::debug!("Closed {} pool for profile '{}'", self.dialect, self.label);
        }
    }
}

/// Maps a driver error: transport failures become `Connection`, everything
/// else keeps the database's own message.
pub(super) fn map_sqlx_error(context: impl Into<String>, error: sqlx::Error) -> DbManError {
    if let sqlx::Error::Database(db) = &error {
        return DbManError::query(db.message());
    }
    let unreachable = matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_)
    );
    if unreachable {
        DbManError::connection_failed(context, error)
    } else {
        DbManError::query(error)
    }
}
