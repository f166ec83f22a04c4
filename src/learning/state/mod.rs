
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::database::sqlite::{clamp_unit, record_timestamp};

/// Reliability assumed for a source that has never been observed
pub const NEUTRAL_RELIABILITY: f64 = 0.5;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .or_else(|_| raw.parse::<NaiveDateTime>())
            .map_err(serde::de::Error::custom)
    }
}

/// One completed search in the learned history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub results_count: usize,
}

impl QueryRecord {
    #[inline]
    pub fn new(query: impl Into<String>, results_count: usize) -> Self {
        Self {
            query: query.into(),
            timestamp: record_timestamp(),
            results_count,
        }
    }

    #[inline]
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Learned state persisted between runs: query history plus the per-source
/// reliability table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    #[serde(default)]
    pub successful_queries: Vec<QueryRecord>,
    #[serde(default)]
    pub source_reliability: BTreeMap<String, f64>,
}

impl LearningState {
    /// Reliability of `source`, or the neutral prior when unseen
    #[inline]
    pub fn reliability(&self, source: &str) -> f64 {
        self.source_reliability
            .get(source)
            .copied()
            .unwrap_or(NEUTRAL_RELIABILITY)
    }

    /// Move the reliability halfway toward `observed` and return the new score
    pub fn update_reliability(&mut self, source: &str, observed: f64) -> f64 {
        let entry = self
            .source_reliability
            .entry(source.to_string())
            .or_insert(NEUTRAL_RELIABILITY);
        *entry = clamp_unit((*entry + clamp_unit(observed)) / 2.0);
        *entry
    }

    #[inline]
    pub fn record_query(&mut self, record: QueryRecord) {
        self.successful_queries.push(record);
    }

    /// Past query strings in insertion order, the similarity corpus
    #[inline]
    pub fn query_history(&self) -> Vec<&str> {
        self.successful_queries
            .iter()
            .map(|record| record.query.as_str())
            .collect()
    }

    /// Up to `limit` most recent records, oldest first
    #[inline]
    pub fn recent_queries(&self, limit: usize) -> &[QueryRecord] {
        let start = self.successful_queries.len().saturating_sub(limit);
        &self.successful_queries[start..]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.successful_queries.is_empty() && self.source_reliability.is_empty()
    }
}

/// JSON file holding the [`LearningState`]
#[derive(Debug, Clone)]
pub struct LearningStateStore {
    path: PathBuf,
}

impl LearningStateStore {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the saved state; a missing file yields the empty state
    pub fn load(&self) -> Result<LearningState> {
        if !self.path.exists() {
            debug!("No learned state at {}, starting empty", self.path.display());
            return Ok(LearningState::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read learned state: {}", self.path.display()))?;
        let state: LearningState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse learned state: {}", self.path.display()))?;

        for score in state.source_reliability.values() {
            if !(0.0..=1.0).contains(score) {
                anyhow::bail!(
                    "Learned state {} holds a reliability outside [0, 1]: {}",
                    self.path.display(),
                    score
                );
            }
        }

        debug!(
            "Loaded {} query records and {} sources from {}",
            state.successful_queries.len(),
            state.source_reliability.len(),
            self.path.display()
        );
        Ok(state)
    }

    /// Replace the saved state atomically: write a sibling temp file, sync it,
    /// then rename it over the target
    pub fn save(&self, state: &LearningState) -> Result<()> {
        let directory = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create directory: {}", directory.display()))?;

        let content =
            serde_json::to_string_pretty(state).context("Failed to serialize learned state")?;

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "learning_state".to_string());
        let temp_path = directory.join(format!(".{}.tmp", file_name));

        {
            let mut file = fs::File::create(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
            file.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
            file.sync_all()
                .with_context(|| format!("Failed to sync temp file: {}", temp_path.display()))?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to replace learned state: {}",
                self.path.display()
            )
        })?;

        debug!("Saved learned state to {}", self.path.display());
        Ok(())
    }
}
