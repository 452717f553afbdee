use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool, Postgres};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::unit_of_work::{Database, Transaction};
use crate::config::{ConfigError, DatabaseConfig};

/// Transaction handle of the Postgres backend.
pub type PgTx = sqlx::Transaction<'static, Postgres>;

/// Schema applied by `migrate` and on server start. Every statement is idempotent.
pub const SCHEMA_SQL: &str = include_str!("../../schema/create_tables.sql");

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Maps unique-constraint violations to `Conflict`, everything else passes through.
    pub fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DatabaseError::Conflict(format!("{} already exists", what));
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// Postgres backend: a shared pool, one transaction per unit of work.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect with bounded retries so the API can start before the database is ready.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config.connection_url()?;
        let attempts = config.connect_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let result = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.connection_timeout))
                .connect(&url)
                .await;

            match result {
                Ok(pool) => {
                    info!("Connected to database (attempt {}/{})", attempt, attempts);
                    return Ok(Self { pool });
                }
                Err(e) => {
                    warn!("Database connection attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(config.retry_delay()).await;
                    }
                }
            }
        }

        Err(DatabaseError::ConnectionError(
            last_error.map(|e| e.to_string()).unwrap_or_else(|| "no attempts made".to_string()),
        ))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn apply_schema(&self) -> Result<(), DatabaseError> {
        self.pool.execute(SCHEMA_SQL).await?;
        info!("Database schema is up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Tx = PgTx;

    async fn begin(&self) -> Result<Self::Tx, DatabaseError> {
        Ok(self.pool.begin().await?)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Transaction for PgTx {
    async fn commit(self) -> Result<(), DatabaseError> {
        sqlx::Transaction::commit(self)
            .await
            .map_err(|e| DatabaseError::Transaction(format!("commit: {}", e)))
    }

    async fn rollback(self) -> Result<(), DatabaseError> {
        sqlx::Transaction::rollback(self)
            .await
            .map_err(|e| DatabaseError::Transaction(format!("rollback: {}", e)))
    }
}
