#[cfg(test)]
mod tests;

use super::models::*;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

pub struct InteractionQueries;

impl InteractionQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, interaction: &NewInteraction) -> Result<InteractionRecord> {
        let id = sqlx::query(
            "INSERT INTO learning_data (query, response, tools_used, success_rating, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&interaction.query)
        .bind(&interaction.response)
        .bind(&interaction.tools_used)
        .bind(interaction.success_rating)
        .bind(record_timestamp())
        .execute(pool)
        .await
        .context("Failed to insert interaction record")?
        .last_insert_rowid();

        debug!("Stored interaction {} for query '{}'", id, interaction.query);

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created interaction"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<InteractionRecord>> {
        let record = sqlx::query_as::<_, InteractionRecord>(
            r#"
            SELECT id, query, response, tools_used, success_rating, timestamp
            FROM learning_data WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get interaction by id")?;

        Ok(record)
    }

    /// Newest interactions first
    #[inline]
    pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<InteractionRecord>> {
        let records = sqlx::query_as::<_, InteractionRecord>(
            r#"
            SELECT id, query, response, tools_used, success_rating, timestamp
            FROM learning_data
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent interactions")?;

        Ok(records)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM learning_data")
            .fetch_one(pool)
            .await
            .context("Failed to count interactions")?;

        Ok(count)
    }

    /// Mean success rating, 0.0 while the table is empty
    #[inline]
    pub async fn average_success_rating(pool: &SqlitePool) -> Result<f64> {
        let average: Option<f64> = sqlx::query_scalar("SELECT AVG(success_rating) FROM learning_data")
            .fetch_one(pool)
            .await
            .context("Failed to average success ratings")?;

        Ok(average.unwrap_or(0.0))
    }
}

pub struct SearchEffectivenessQueries;

impl SearchEffectivenessQueries {
    /// Insert every record of one search inside a single transaction
    #[inline]
    pub async fn create_batch(pool: &SqlitePool, records: &[NewSearchEffectiveness]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let timestamp = record_timestamp();
        let mut tx = pool
            .begin()
            .await
            .context("Failed to begin search effectiveness transaction")?;

        let mut inserted = 0;
        for record in records {
            inserted += sqlx::query(
                "INSERT INTO search_effectiveness (search_query, source_url, content_snippet, relevance_score, timestamp) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&record.search_query)
            .bind(&record.source_url)
            .bind(&record.content_snippet)
            .bind(record.relevance_score)
            .bind(timestamp)
            .execute(&mut *tx)
            .await
            .context("Failed to insert search effectiveness record")?
            .rows_affected();
        }

        tx.commit()
            .await
            .context("Failed to commit search effectiveness records")?;

        debug!("Stored {} search effectiveness records", inserted);
        Ok(inserted)
    }

    #[inline]
    pub async fn list_for_query(
        pool: &SqlitePool,
        search_query: &str,
    ) -> Result<Vec<SearchEffectivenessRecord>> {
        let records = sqlx::query_as::<_, SearchEffectivenessRecord>(
            r#"
            SELECT id, search_query, source_url, content_snippet, relevance_score, timestamp
            FROM search_effectiveness
            WHERE search_query = ?
            ORDER BY id ASC
            "#,
        )
        .bind(search_query)
        .fetch_all(pool)
        .await
        .context("Failed to list search effectiveness records")?;

        Ok(records)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_effectiveness")
            .fetch_one(pool)
            .await
            .context("Failed to count search effectiveness records")?;

        Ok(count)
    }

    /// Mean relevance score, 0.0 while the table is empty
    #[inline]
    pub async fn average_relevance(pool: &SqlitePool) -> Result<f64> {
        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(relevance_score) FROM search_effectiveness")
                .fetch_one(pool)
                .await
                .context("Failed to average relevance scores")?;

        Ok(average.unwrap_or(0.0))
    }
}

pub struct StatisticsQueries;

impl StatisticsQueries {
    #[inline]
    pub async fn learning_statistics(pool: &SqlitePool) -> Result<LearningStatistics> {
        Ok(LearningStatistics {
            total_interactions: InteractionQueries::count(pool).await?,
            average_success_rating: InteractionQueries::average_success_rating(pool).await?,
            total_searches: SearchEffectivenessQueries::count(pool).await?,
            average_relevance: SearchEffectivenessQueries::average_relevance(pool).await?,
        })
    }
}
