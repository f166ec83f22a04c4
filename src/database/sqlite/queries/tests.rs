use super::*;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true),
        )
        .await
        .expect("Failed to create test pool");

    sqlx::raw_sql(include_str!("../migrations/001_initial_schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

#[tokio::test]
async fn interaction_create_and_get() {
    let (_temp_dir, pool) = create_test_pool().await;

    let interaction = NewInteraction::from_outcome("what is rust", "A systems language", true);
    let created = InteractionQueries::create(&pool, &interaction)
        .await
        .expect("Failed to create interaction");

    assert_eq!(created.query, "what is rust");
    assert_eq!(created.response, "A systems language");
    assert_eq!(created.tools_used, DEFAULT_TOOLS_USED);
    assert!((created.success_rating - 1.0).abs() < f64::EPSILON);

    let fetched = InteractionQueries::get_by_id(&pool, created.id)
        .await
        .expect("Failed to get interaction")
        .expect("Interaction should exist");
    assert_eq!(fetched, created);

    assert!(
        InteractionQueries::get_by_id(&pool, created.id + 100)
            .await
            .expect("Failed to get interaction")
            .is_none()
    );
}

#[tokio::test]
async fn interaction_aggregates() {
    let (_temp_dir, pool) = create_test_pool().await;

    assert_eq!(InteractionQueries::count(&pool).await.expect("count"), 0);
    assert!(
        InteractionQueries::average_success_rating(&pool)
            .await
            .expect("average")
            .abs()
            < f64::EPSILON
    );

    for success in [true, true, false, true] {
        InteractionQueries::create(&pool, &NewInteraction::from_outcome("q", "r", success))
            .await
            .expect("Failed to create interaction");
    }

    assert_eq!(InteractionQueries::count(&pool).await.expect("count"), 4);
    let average = InteractionQueries::average_success_rating(&pool)
        .await
        .expect("average");
    assert!((average - 0.75).abs() < 1e-9);
}

#[tokio::test]
async fn recent_interactions_newest_first() {
    let (_temp_dir, pool) = create_test_pool().await;

    for index in 0..12 {
        InteractionQueries::create(
            &pool,
            &NewInteraction::from_outcome(format!("query {index}"), "r", true),
        )
        .await
        .expect("Failed to create interaction");
    }

    let recent = InteractionQueries::recent(&pool, 10)
        .await
        .expect("Failed to list recent interactions");

    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0].query, "query 11");
    assert_eq!(recent[9].query, "query 2");
}

#[tokio::test]
async fn search_effectiveness_batch() {
    let (_temp_dir, pool) = create_test_pool().await;

    let records = vec![
        NewSearchEffectiveness::new("rust async", "DuckDuckGo", "Async in Rust", 0.65),
        NewSearchEffectiveness::new("rust async", "Custom Search", "Tokio: runtime", 0.6),
    ];

    let inserted = SearchEffectivenessQueries::create_batch(&pool, &records)
        .await
        .expect("Failed to insert batch");
    assert_eq!(inserted, 2);

    let stored = SearchEffectivenessQueries::list_for_query(&pool, "rust async")
        .await
        .expect("Failed to list records");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].source_url, "DuckDuckGo");
    assert_eq!(stored[1].source_url, "Custom Search");
    assert_eq!(stored[0].timestamp, stored[1].timestamp);

    assert_eq!(SearchEffectivenessQueries::count(&pool).await.expect("count"), 2);
    let average = SearchEffectivenessQueries::average_relevance(&pool)
        .await
        .expect("average");
    assert!((average - 0.625).abs() < 1e-9);
}

#[tokio::test]
async fn empty_batch_writes_nothing() {
    let (_temp_dir, pool) = create_test_pool().await;

    let inserted = SearchEffectivenessQueries::create_batch(&pool, &[])
        .await
        .expect("Failed to insert empty batch");

    assert_eq!(inserted, 0);
    assert_eq!(SearchEffectivenessQueries::count(&pool).await.expect("count"), 0);
}

#[tokio::test]
async fn learning_statistics_aggregates_both_tables() {
    let (_temp_dir, pool) = create_test_pool().await;

    InteractionQueries::create(&pool, &NewInteraction::from_outcome("q", "r", true))
        .await
        .expect("Failed to create interaction");
    InteractionQueries::create(&pool, &NewInteraction::from_outcome("q", "r", false))
        .await
        .expect("Failed to create interaction");
    SearchEffectivenessQueries::create_batch(
        &pool,
        &[NewSearchEffectiveness::new("q", "DuckDuckGo", "c", 0.8)],
    )
    .await
    .expect("Failed to insert batch");

    let statistics = StatisticsQueries::learning_statistics(&pool)
        .await
        .expect("Failed to compute statistics");

    assert_eq!(statistics.total_interactions, 2);
    assert!((statistics.average_success_rating - 0.5).abs() < 1e-9);
    assert_eq!(statistics.total_searches, 1);
    assert!((statistics.average_relevance - 0.8).abs() < 1e-9);
}
