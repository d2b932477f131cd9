//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connection pool tuning.
///
/// The defaults suit a single process serving a handful of concurrent
/// requests against a local SQLite file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// How long a writer waits on `SQLITE_BUSY` before giving up.
    pub busy_timeout: Duration,
    /// How long to wait for a free connection from the pool.
    pub acquire_timeout: Duration,
}
impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            // Concurrent get-or-create calls all write; with only one writer
            // at a time in WAL mode, too small a timeout surfaces SQLITE_BUSY.
            busy_timeout: Duration::from_millis(1500),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Database connection pool for the catalogue.
///
/// This is the process-wide storage handle. The entry point creates it once,
/// hands [`Repository`](crate::Repository) values derived from it to whoever
/// needs them, and calls [`close`](Database::close) on shutdown.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, settings: PoolSettings) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to EVERY connection the pool
            // opens, not only the first.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options.busy_timeout(settings.busy_timeout))
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the catalogue database at the given path.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with(path, PoolSettings::default()).await
    }

    /// Connect to the catalogue database at the given path with explicit pool settings.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn connect_with(path: impl AsRef<Path>, settings: PoolSettings) -> Result<Self> {
        let options = Self::base_options().filename(path.as_ref()).create_if_missing(true);
        Self::new(options, settings).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // In-memory database must either use the same cache `.shared_cache(true)`,
        // or be limited to one connection. Otherwise parallel connections will
        // see different databases that contain different data.
        let settings = PoolSettings { max_connections: 1, ..PoolSettings::default() };
        Self::new(options, settings).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Enable WAL mode so readers never block the single writer.
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // Referential integrity between words, translations and sentences
            // is enforced here and nowhere else.
            .foreign_keys(true)
            // PRAGMA synchronous = NORMAL (balance between safety and speed)
            .synchronous(SqliteSynchronous::Normal)
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA locking_mode = NORMAL;
                PRAGMA cache_size = -4096;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run database migrations.
    ///
    /// This is called automatically by `connect` and `connect_in_memory`.
    /// Already applied migrations are skipped, so running it again is a no-op.
    #[instrument("performing database migrations", skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// This waits for all connections to be returned to the pool and then
    /// closes them. After calling this, the Database instance should not
    /// be used.
    #[instrument(skip(self))]
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
        tracing::debug!("database pool closed");
    }
}
