//! SQLite pool setup and the long-lived [`Database`] handle.

use crate::db::Db;
use crate::error::{StorageError, StorageResult};
use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Where the check-in database lives and how the pool behaves
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_path: String,
    pub max_connections: u32,
    /// Idle connections kept warm
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
    pub create_if_missing: bool,
    /// Apply `migrations/` right after connecting
    pub auto_migrate: bool,
    /// Tables the generic [`Db`] helpers may touch (empty = any valid name)
    pub allowed_tables: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: "checkin.db".to_string(),
            max_connections: 10,
            min_connections: 2,
            max_lifetime: Duration::from_secs(30 * 60),
            acquire_timeout: Duration::from_secs(30),
            create_if_missing: true,
            auto_migrate: true,
            allowed_tables: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    /// Defaults with a different file
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Default::default()
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn auto_migrate(mut self, migrate: bool) -> Self {
        self.auto_migrate = migrate;
        self
    }

    /// Restrict the generic helpers to the given tables
    pub fn allow_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    fn connect_options(&self) -> StorageResult<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", self.database_path))
            .map_err(|e| StorageError::Configuration(format!("bad database path: {e}")))?
            .create_if_missing(self.create_if_missing)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(10))
            .disable_statement_logging();
        Ok(options)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .max_lifetime(Some(self.max_lifetime))
            .acquire_timeout(self.acquire_timeout)
    }

    fn allow_list(&self) -> Option<Arc<BTreeSet<String>>> {
        if self.allowed_tables.is_empty() {
            None
        } else {
            Some(Arc::new(self.allowed_tables.iter().cloned().collect()))
        }
    }
}

/// Process-wide pool
///
/// Owned by the process entry point and handed to request handlers, which
/// take a fresh [`Db`] handle per request via [`Database::db`].
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    healthy: bool,
    allowed_tables: Option<Arc<BTreeSet<String>>>,
}

impl Database {
    /// Open the pool, creating the file's directory first, and migrate
    ///
    /// # Example
    ///
    /// ```no_run
    /// use checkin_storage::connection::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = DatabaseConfig::new("checkin.db")
    ///     .max_connections(10)
    ///     .auto_migrate(true);
    ///
    /// let db = Database::new(config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        // sqlite creates the file but not its directory
        if let Some(parent) = Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Configuration(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = config.connect_options()?;
        let pool = config.pool_options().connect_with(options).await?;

        let db = Self {
            pool,
            healthy: true,
            allowed_tables: config.allow_list(),
        };

        if config.auto_migrate {
            db.migrate().await?;
        }

        info!(path = %config.database_path, "database ready");
        Ok(db)
    }

    /// Connect, or fall back to a failed handle instead of returning an error
    ///
    /// The failure is logged and [`Database::is_successful`] reports `false`.
    /// Statements on a failed handle return [`StorageError::Unavailable`]
    /// without reaching the lazily built pool.
    pub async fn connect_or_degraded(config: DatabaseConfig) -> Self {
        match Self::new(config.clone()).await {
            Ok(db) => db,
            Err(e) => {
                error!(error = %e, path = %config.database_path, "database connection failed");
                let options = config
                    .connect_options()
                    .unwrap_or_else(|_| SqliteConnectOptions::new());
                Self {
                    pool: config.pool_options().connect_lazy_with(options),
                    healthy: false,
                    allowed_tables: config.allow_list(),
                }
            }
        }
    }

    /// Private migrated database on a single connection, for tests
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // In-memory databases live and die with their single connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            healthy: true,
            allowed_tables: None,
        };
        db.migrate().await?;

        Ok(db)
    }

    /// Apply pending migrations; the SQL files are embedded at build time
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Whether the initial connection succeeded
    pub fn is_successful(&self) -> bool {
        self.healthy
    }

    /// A fresh query handle with default execution options
    pub fn db(&self) -> Db {
        Db::new(self.pool.clone(), self.healthy, self.allowed_tables.clone())
    }

    /// Wait for checked-out connections, then close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Round trip a trivial statement
    pub async fn health_check(&self) -> StorageResult<()> {
        if !self.healthy {
            return Err(StorageError::Unavailable);
        }
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
