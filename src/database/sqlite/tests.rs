use super::*;
use crate::config::Config;
use anyhow::Result;
use std::collections::HashSet;
use tempfile::TempDir;

async fn create_test_database() -> Result<(TempDir, Database)> {
    let temp_dir = TempDir::new()?;
    let database = Database::new(Config::with_base_dir(temp_dir.path()).database_path()).await?;
    Ok((temp_dir, database))
}

#[tokio::test]
async fn integration_schema_migration() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'",
    )
    .fetch_all(database.pool())
    .await?;

    let expected_tables: HashSet<&'static str> = ["learning_data", "search_effectiveness"]
        .into_iter()
        .collect();

    let actual_tables: HashSet<&str> = tables.iter().map(|t| t.as_str()).collect();
    assert_eq!(actual_tables, expected_tables);

    Ok(())
}

#[tokio::test]
async fn integration_reopen_preserves_rows() -> Result<()> {
    let temp_dir = TempDir::new()?;

    {
        let database = Database::new(Config::with_base_dir(temp_dir.path()).database_path()).await?;
        database
            .append_interaction(&NewInteraction::from_outcome("persisted", "yes", true))
            .await?;
        database
            .append_search_effectiveness(&[NewSearchEffectiveness::new(
                "persisted",
                "DuckDuckGo",
                "content",
                0.7,
            )])
            .await?;
        database.close().await;
    }

    let database = Database::new(Config::with_base_dir(temp_dir.path()).database_path()).await?;
    assert_eq!(database.count_interactions().await?, 1);
    assert_eq!(database.count_searches().await?, 1);

    let recent = database.recent_interactions(10).await?;
    assert_eq!(recent[0].query, "persisted");

    Ok(())
}

#[tokio::test]
async fn integration_learning_workflow() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    let records = vec![
        NewSearchEffectiveness::new("climate", "DuckDuckGo", "Climate summary", 0.65),
        NewSearchEffectiveness::new("climate", "Custom Search", "IPCC: report", 0.6),
        NewSearchEffectiveness::new("climate", "Custom Search", "NASA: data", 0.6),
    ];
    assert_eq!(database.append_search_effectiveness(&records).await?, 3);

    database
        .append_interaction(&NewInteraction::from_outcome("climate", "Answer", true))
        .await?;
    database
        .append_interaction(&NewInteraction::from_outcome("climate", "Error: x", false))
        .await?;

    let statistics = database.learning_statistics().await?;
    assert_eq!(statistics.total_interactions, 2);
    assert!((statistics.average_success_rating - 0.5).abs() < 1e-9);
    assert_eq!(statistics.total_searches, 3);
    assert!((statistics.average_relevance - (0.65 + 0.6 + 0.6) / 3.0).abs() < 1e-9);

    assert_eq!(database.count_interactions().await?, 2);
    assert_eq!(database.count_searches().await?, 3);
    assert!((database.avg_success_rating().await? - 0.5).abs() < 1e-9);
    assert!((database.avg_relevance().await? - statistics.average_relevance).abs() < 1e-12);

    let stored = database.search_records_for_query("climate").await?;
    assert_eq!(stored.len(), 3);
    assert!(database.search_records_for_query("other").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn integration_concurrent_appends() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    let mut handles = Vec::new();
    for worker in 0..8 {
        let database = database.clone();
        handles.push(tokio::spawn(async move {
            for index in 0..5 {
                database
                    .append_interaction(&NewInteraction::from_outcome(
                        format!("worker {worker} query {index}"),
                        "response",
                        true,
                    ))
                    .await?;
            }
            anyhow::Ok(())
        }));
    }

    for handle in handles {
        handle.await??;
    }

    assert_eq!(database.count_interactions().await?, 40);
    Ok(())
}
