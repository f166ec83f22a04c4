use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[cfg(test)]
mod tests;

pub mod models;
pub mod queries;

pub use models::*;
pub use queries::{InteractionQueries, SearchEffectivenessQueries, StatisticsQueries};

pub type DbPool = Pool<Sqlite>;

/// Handle to the append-only interaction and search effectiveness tables
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    // Interaction operations
    pub async fn append_interaction(&self, interaction: &NewInteraction) -> Result<InteractionRecord> {
        InteractionQueries::create(&self.pool, interaction).await
    }

    pub async fn count_interactions(&self) -> Result<i64> {
        InteractionQueries::count(&self.pool).await
    }

    pub async fn avg_success_rating(&self) -> Result<f64> {
        InteractionQueries::average_success_rating(&self.pool).await
    }

    pub async fn recent_interactions(&self, limit: usize) -> Result<Vec<InteractionRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        InteractionQueries::recent(&self.pool, limit).await
    }

    // Search effectiveness operations
    pub async fn append_search_effectiveness(
        &self,
        records: &[NewSearchEffectiveness],
    ) -> Result<u64> {
        SearchEffectivenessQueries::create_batch(&self.pool, records).await
    }

    pub async fn search_records_for_query(
        &self,
        search_query: &str,
    ) -> Result<Vec<SearchEffectivenessRecord>> {
        SearchEffectivenessQueries::list_for_query(&self.pool, search_query).await
    }

    pub async fn count_searches(&self) -> Result<i64> {
        SearchEffectivenessQueries::count(&self.pool).await
    }

    pub async fn avg_relevance(&self) -> Result<f64> {
        SearchEffectivenessQueries::average_relevance(&self.pool).await
    }

    pub async fn learning_statistics(&self) -> Result<LearningStatistics> {
        StatisticsQueries::learning_statistics(&self.pool).await
    }

    /// Wait for in-flight queries and close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
