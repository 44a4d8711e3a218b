//! SQLite backend: pool construction and schema migrations
//!
//! Provides persistent storage using SQLite with foreign keys enforced and a
//! busy timeout tuned for concurrent checkout writes. Domain operations live
//! in sibling modules as `impl SqliteStore` blocks.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite storage backend, cheap to clone (pool is internally shared)
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the database, creating the file if missing
    ///
    /// # Arguments
    /// * `database_url` - sqlx connection string (e.g. "sqlite://auroramart.db")
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to SQLite database: {}", database_url);

        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        // Per-statement logging is too verbose at info level
        options = options.disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        info!("SQLite connection established");

        Ok(Self { pool })
    }

    /// Run embedded schema migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Direct pool access for tests and one-off maintenance queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
