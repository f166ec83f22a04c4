//! Adaptive ranking and learning feedback
//!
//! [`LearningService`] owns the learned state and ties the pieces together:
//! similarity lookup against past queries, retrieval, ranking by blended
//! reliability, feedback into the store and on-demand analytics.

pub mod analytics;
pub mod feedback;
pub mod ranking;
pub mod similarity;
pub mod state;


use std::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::sqlite::{
    Database, InteractionRecord, LearningStatistics, NewInteraction,
};
use crate::retriever::{BackendReport, Retriever};
use crate::{ResearchError, Result};

pub use analytics::{DETAIL_WINDOW, NO_LEARNING_DATA_MESSAGE, render_detail, render_summary};
pub use feedback::{FeedbackRecorder, StoreWriteError, apply_feedback};
pub use ranking::{NO_RESULTS_MESSAGE, RankedResult, blend, format_results, rank_candidates};
pub use similarity::{SimilarQuery, SimilarityError, SimilarityMatcher};
pub use state::{LearningState, LearningStateStore, NEUTRAL_RELIABILITY, QueryRecord};

/// Everything one search produced
#[derive(Debug)]
pub struct SearchReport {
    pub query: String,
    /// Text handed back to the caller
    pub formatted: String,
    /// Closest past query, informational only
    pub similar_query: Option<SimilarQuery>,
    /// Every ranked result, including those beyond the requested count
    pub ranked: Vec<RankedResult>,
    pub backends: Vec<BackendReport>,
    pub all_backends_failed: bool,
    /// Set when persisting the outcome failed; the search itself still succeeded
    pub learning_error: Option<String>,
}

/// Search and learning entry point shared by the CLI and the tool server
#[derive(Debug)]
pub struct LearningService {
    config: Config,
    database: Database,
    recorder: FeedbackRecorder,
    state_store: LearningStateStore,
    state: Mutex<LearningState>,
    retriever: Retriever,
    matcher: SimilarityMatcher,
}

impl LearningService {
    /// Open the store under the configured data directory with the
    /// configured backends
    pub async fn open(config: Config) -> Result<Self> {
        let retriever = Retriever::from_config(&config);
        Self::open_with_retriever(config, retriever).await
    }

    pub async fn open_with_retriever(config: Config, retriever: Retriever) -> Result<Self> {
        let base_dir = config.get_base_dir();
        if !base_dir.as_os_str().is_empty() {
            fs::create_dir_all(base_dir)?;
        }

        let database = Database::new(config.database_path())
            .await
            .map_err(|e| ResearchError::Database(format!("{:#}", e)))?;

        let state_store = LearningStateStore::new(config.learning_state_path());
        let state = state_store
            .load()
            .map_err(|e| ResearchError::Store(format!("{:#}", e)))?;

        info!(
            "Learning service ready: {} past queries, {} known sources, backends {:?}",
            state.successful_queries.len(),
            state.source_reliability.len(),
            retriever.backend_names()
        );

        Ok(Self {
            matcher: SimilarityMatcher::new(config.search.similarity_threshold),
            recorder: FeedbackRecorder::new(database.clone(), state_store.clone()),
            config,
            database,
            state_store,
            state: Mutex::new(state),
            retriever,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Current reliability of `source`
    pub async fn reliability(&self, source: &str) -> f64 {
        self.state.lock().await.reliability(source)
    }

    pub async fn state_snapshot(&self) -> LearningState {
        self.state.lock().await.clone()
    }

    /// Most similar past query above the configured threshold
    pub async fn find_similar_query(&self, query: &str) -> Option<SimilarQuery> {
        let history: Vec<String> = {
            let state = self.state.lock().await;
            state
                .successful_queries
                .iter()
                .map(|record| record.query.clone())
                .collect()
        };
        self.matcher.find_similar(query, &history)
    }

    /// Run one search: retrieve, rank, record the outcome and format the
    /// first `count` results
    pub async fn search(&self, query: &str, count: usize) -> SearchReport {
        let similar_query = self.find_similar_query(query).await;
        if let Some(similar) = &similar_query {
            info!(
                "Found similar past query: '{}' ({:.2})",
                similar.query, similar.score
            );
        }

        let outcome = self.retriever.retrieve(query, count).await;
        let all_backends_failed = outcome.all_failed();
        if all_backends_failed {
            warn!("Every search backend failed for '{}'", query);
        }
        let candidates = outcome.candidates();

        let (ranked, learning_error) = {
            let mut state = self.state.lock().await;
            let ranked = rank_candidates(candidates, &state);
            let recorded = self.recorder.record_search(query, &ranked, &mut state).await;
            (ranked, recorded.err().map(|e| e.to_string()))
        };

        debug!(
            "Search for '{}' ranked {} results, returning up to {}",
            query,
            ranked.len(),
            count
        );

        SearchReport {
            query: query.to_string(),
            formatted: format_results(&ranked, count),
            similar_query,
            ranked,
            backends: outcome.reports,
            all_backends_failed,
            learning_error,
        }
    }

    /// Formatted search results only
    pub async fn search_text(&self, query: &str, count: usize) -> String {
        self.search(query, count).await.formatted
    }

    /// Record a pass/fail interaction with the default tools descriptor
    pub async fn record_interaction(
        &self,
        query: &str,
        response: &str,
        success: bool,
    ) -> Result<InteractionRecord> {
        self.append_interaction(NewInteraction::from_outcome(query, response, success))
            .await
    }

    /// Record an interaction with an explicit tools descriptor and a rating in [0, 1]
    pub async fn record_interaction_with(
        &self,
        query: &str,
        response: &str,
        tools_used: &str,
        success_rating: f64,
    ) -> Result<InteractionRecord> {
        self.append_interaction(NewInteraction::new(
            query,
            response,
            tools_used,
            success_rating,
        ))
        .await
    }

    async fn append_interaction(&self, interaction: NewInteraction) -> Result<InteractionRecord> {
        let record = self
            .database
            .append_interaction(&interaction)
            .await
            .map_err(|e| ResearchError::Database(format!("{:#}", e)))?;
        debug!(
            "Recorded interaction {} ({}, rating {:.2})",
            record.id, record.tools_used, record.success_rating
        );
        Ok(record)
    }

    pub async fn learning_statistics(&self) -> Result<LearningStatistics> {
        self.database
            .learning_statistics()
            .await
            .map_err(|e| ResearchError::Database(format!("{:#}", e)))
    }

    /// Four-line performance summary
    pub async fn analytics_summary(&self) -> Result<String> {
        Ok(render_summary(&self.learning_statistics().await?))
    }

    /// Human-readable dump of recent learned data; read failures are
    /// reported in the returned text
    pub async fn analytics_detail(&self) -> String {
        if !self.state_store.exists() {
            return NO_LEARNING_DATA_MESSAGE.to_string();
        }

        let state = self.state_snapshot().await;
        match self.database.recent_interactions(DETAIL_WINDOW).await {
            Ok(interactions) => render_detail(&state, &interactions),
            Err(e) => format!("Error reading learning data: {:#}", e),
        }
    }

    /// Flush the learned state and close the database pool
    pub async fn close(&self) -> Result<()> {
        {
            let state = self.state.lock().await;
            if !state.is_empty() || self.state_store.exists() {
                self.recorder
                    .save_state(&state)
                    .await
                    .map_err(|e| ResearchError::Store(e.to_string()))?;
            }
        }
        self.database.close().await;
        info!("Learning service closed");
        Ok(())
    }
}
