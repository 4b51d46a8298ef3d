//! Database layer for Roster
//!
//! Persists teams, users and pull requests in SQLite and implements the
//! [`roster_core::ReviewStore`] contract on top of sqlx transactions.

pub mod directory;
pub mod error;
mod schema;
pub mod store;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub use error::{Error, Result};
pub use store::SqliteTx;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long a connection waits on a locked database
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from(&roster_core::DatabaseSettings::default())
    }
}

impl From<&roster_core::DatabaseSettings> for DatabaseConfig {
    fn from(settings: &roster_core::DatabaseSettings) -> Self {
        Self {
            path: settings.path.clone(),
            max_connections: settings.max_connections,
            busy_timeout: settings.busy_timeout,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database config with the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the maximum number of connections
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// SQLite-backed review store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path` with default settings
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::connect(DatabaseConfig::new(db_path.as_ref())).await
    }

    /// Connect with the given configuration and run pending migrations
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        // Create parent directory if needed
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("Failed to create database directory: {}", e)))?;
        }

        let url = format!("sqlite://{}", config.path.display());
        let options = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;

        debug!(path = %config.path.display(), "Database ready");
        Ok(Self { pool })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let _store = SqliteStore::new(&db_path).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_database_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("test.db")).await.unwrap();

        for table in ["teams", "users", "pull_requests"] {
            let result: (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?",
            )
            .bind(table)
            .fetch_one(store.pool())
            .await
            .unwrap();
            assert_eq!(result.0, 1, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let store = SqliteStore::new(&db_path).await.unwrap();
        sqlx::query("INSERT INTO teams (team_name) VALUES ('backend')")
            .execute(store.pool())
            .await
            .unwrap();
        store.pool().close().await;

        let store = SqliteStore::new(&db_path).await.unwrap();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM teams")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = roster_core::DatabaseSettings {
            path: PathBuf::from("/tmp/roster.db"),
            max_connections: 2,
            busy_timeout: Duration::from_millis(250),
        };
        let config = DatabaseConfig::from(&settings).with_max_connections(3);
        assert_eq!(config.path, PathBuf::from("/tmp/roster.db"));
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }
}
