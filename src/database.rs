// src/database.rs
mod models;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, error, info};

use crate::{
    config::DatabaseConfig,
    errors::{IssRecorderError, Result},
    models::{NormalizedPosition, StoredRecord},
    sink::PositionSink,
};
use self::models::PositionRow;

/// Database sink for ISS positions
///
/// Holds one long-lived pool, capped at a single connection by default.
/// The pool is released by [`DatabaseSink::close`].
pub struct DatabaseSink {
    pool: PgPool,
}

impl DatabaseSink {
    /// Connect to the configured database and prepare the schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.connection_url();
        info!(
            "Connecting to database: host={}, port={}, max_connections={}",
            config.host, config.port, config.max_connections
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                IssRecorderError::DatabaseConnectionError(e.to_string())
            })?;

        Self::new(pool).await
    }

    /// Create a sink over an existing pool, running pending migrations
    pub async fn new(pool: PgPool) -> Result<Self> {
        if let Err(e) = Self::create_table(&pool).await {
            pool.close().await;
            return Err(e);
        }
        Ok(Self { pool })
    }

    /// Create table `iss` unless it already exists
    ///
    /// An existing table is fine; any other failure is fatal.
    async fn create_table(pool: &PgPool) -> Result<()> {
        sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
            error!("Failed to create database tables: {}", e);
            IssRecorderError::MigrationError(e.to_string())
        })
    }

    /// Insert one position
    pub async fn persist(&self, position: &NormalizedPosition) -> Result<()> {
        sqlx::query("INSERT INTO iss (position) VALUES ($1)")
            .bind(position.to_wkt())
            .execute(&self.pool)
            .await?;

        debug!("Inserted position {}", position);
        Ok(())
    }

    /// Stream all stored positions, oldest first
    ///
    /// Rows are fetched lazily as the stream is polled.
    pub fn list_positions(&self) -> BoxStream<'_, Result<StoredRecord>> {
        sqlx::query_as::<_, PositionRow>(
            "SELECT timestamp, position FROM iss ORDER BY timestamp",
        )
        .fetch(&self.pool)
        .map(|row| row.map_err(IssRecorderError::from).and_then(StoredRecord::try_from))
        .boxed()
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the pool, waiting for the connection to be released
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            info!("Closing database connection");
            self.pool.close().await;
        }
    }
}

#[async_trait]
impl PositionSink for DatabaseSink {
    async fn store(&mut self, position: &NormalizedPosition) -> Result<()> {
        self.persist(position).await
    }

    async fn close(&mut self) {
        DatabaseSink::close(self).await;
    }

    fn name(&self) -> &'static str {
        "database"
    }
}
