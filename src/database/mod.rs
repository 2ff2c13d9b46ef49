pub mod memory;
pub mod models;
pub mod queries;
pub mod schema;
pub mod store;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{LedgerError, Result};

pub use memory::MemoryStore;
pub use models::{Submission, SubmissionRecord};
pub use store::LedgerStore;

/// SQLite-backed durable ledger store
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_options(database_url, 5, Duration::from_secs(5)).await
    }

    pub async fn with_options(
        database_url: &str,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| LedgerError::Config(format!("Invalid database URL {}: {}", database_url, e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Connected to ledger database at {}", database_url);
        Ok(Database { pool })
    }

    /// Single-connection in-memory database, migrated and ready to use.
    pub async fn new_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| LedgerError::Config(format!("Invalid in-memory database URL: {}", e)))?
            .foreign_keys(true);

        // Every connection to :memory: is a separate database, so keep exactly
        // one alive for the pool's whole life.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(schema::LEDGER_SCHEMA)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
