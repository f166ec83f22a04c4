
use thiserror::Error;
use tracing::{debug, error};

use super::ranking::RankedResult;
use super::state::{LearningState, LearningStateStore, QueryRecord};
use crate::database::sqlite::{Database, NewSearchEffectiveness};

#[derive(Debug, Error)]
pub enum StoreWriteError {
    #[error("failed to persist search effectiveness records: {0}")]
    Records(String),
    #[error("failed to save learned state: {0}")]
    State(String),
}

/// Apply each result's final relevance to its source, in rank order
pub fn apply_feedback(state: &mut LearningState, ranked: &[RankedResult]) {
    for result in ranked {
        let updated = state.update_reliability(&result.source, result.final_relevance);
        debug!(
            "Reliability of {} is now {:.3} after observing {:.3}",
            result.source, updated, result.final_relevance
        );
    }
}

/// Persists ranked results and folds them back into the learned state
#[derive(Debug, Clone)]
pub struct FeedbackRecorder {
    database: Database,
    store: LearningStateStore,
}

impl FeedbackRecorder {
    #[inline]
    pub fn new(database: Database, store: LearningStateStore) -> Self {
        Self { database, store }
    }

    /// Record one completed search.
    ///
    /// The in-memory state is always updated. Storage failures are logged and
    /// returned after every step has been attempted.
    pub async fn record_search(
        &self,
        query: &str,
        ranked: &[RankedResult],
        state: &mut LearningState,
    ) -> Result<(), StoreWriteError> {
        let rows: Vec<NewSearchEffectiveness> = ranked
            .iter()
            .map(|result| {
                NewSearchEffectiveness::new(
                    query,
                    result.source.as_str(),
                    &result.content,
                    result.final_relevance,
                )
            })
            .collect();

        let records_result = match self.database.append_search_effectiveness(&rows).await {
            Ok(written) => {
                debug!("Stored {} search effectiveness records for '{}'", written, query);
                Ok(())
            }
            Err(e) => {
                error!("Failed to store search effectiveness for '{}': {:#}", query, e);
                Err(StoreWriteError::Records(format!("{:#}", e)))
            }
        };

        apply_feedback(state, ranked);
        state.record_query(QueryRecord::new(query, ranked.len()));

        let state_result = self.save_state(state).await;
        records_result.and(state_result)
    }

    /// Write the whole learned state to its file on the blocking pool
    pub async fn save_state(&self, state: &LearningState) -> Result<(), StoreWriteError> {
        let store = self.store.clone();
        let snapshot = state.clone();
        let saved = match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("state save task failed: {}", e)),
        };

        saved.map_err(|e| {
            error!(
                "Failed to save learned state to {}: {:#}",
                self.store.path().display(),
                e
            );
            StoreWriteError::State(format!("{:#}", e))
        })
    }
}
