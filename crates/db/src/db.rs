//! Opening the record store.

use exn::ResultExt;
use sqlx::{Executor, SqliteConnection};
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
/// Request path and every in-flight generation task share the pool.
const FILE_POOL_SIZE: u32 = 8;
/// Generation tasks write concurrently and WAL admits one writer at a time.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);
/// Per-connection settings without a `SqliteConnectOptions` builder.
const CONNECTION_PRAGMAS: &str = "PRAGMA wal_autocheckpoint = 800; PRAGMA cache_size = -8192; PRAGMA temp_store = MEMORY;";

/// Where the records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A database file, created along with its parent directories.
    File(PathBuf),
    /// A private in-memory database that lives as long as the pool.
    Memory,
}
impl Location {
    fn connect_options(&self) -> SqliteConnectOptions {
        let options = SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            // Asset rows cascade with their favicon.
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);
        match self {
            Location::File(path) => options.filename(path).create_if_missing(true),
            Location::Memory => options.filename(":memory:"),
        }
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, meta| Box::pin(async move { apply_pragmas(conn, meta).await }));
        match self {
            Location::File(_) => pool.max_connections(FILE_POOL_SIZE),
            // Each ":memory:" connection is a separate database: keep exactly
            // one, and never let the pool retire it.
            Location::Memory => pool
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        }
    }
}

async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
    conn.execute(sqlx::raw_sql(CONNECTION_PRAGMAS)).await?;
    Ok(())
}

/// Connection pool for the record store, migrated on open.
///
/// Queries go through [`Repository`](crate::Repository), built with
/// `Repository::from(&db)`.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    #[instrument(level = "debug", skip_all, fields(?location))]
    pub async fn open(location: Location) -> Result<Self> {
        if let Location::File(path) = &location
            && let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
        }
        let pool = location
            .pool_options()
            .connect_with(location.connect_options())
            .await
            .or_raise(|| ErrorKind::Database)?;
        MIGRATOR.run(&pool).await.or_raise(|| ErrorKind::Migration)?;
        Ok(Self { pool })
    }

    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Location::File(path.as_ref().to_path_buf())).await
    }

    /// Not gated behind `#[cfg(test)]`: other crates test against it too.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(Location::Memory).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Let SQLite refresh its planner statistics, then close every
    /// connection once it is returned.
    pub async fn close(&self) {
        if let Err(err) = sqlx::query("PRAGMA optimize").execute(&self.pool).await {
            tracing::debug!(error = %err, "skipped optimize on close");
        }
        self.pool.close().await;
    }
}
