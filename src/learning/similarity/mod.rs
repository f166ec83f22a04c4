
use fancy_regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Default score a past query must exceed to count as similar
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

static TOKEN_PATTERN: LazyLock<Result<Regex, String>> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").map_err(|e| e.to_string()));

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("empty vocabulary; the documents only contain stop words or single characters")]
    EmptyVocabulary,
    #[error("token pattern failed: {0}")]
    Pattern(String),
}

/// Closest past query and its cosine similarity
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarQuery {
    pub query: String,
    pub score: f64,
}

/// Finds the most similar past query using TF-IDF vectors and cosine
/// similarity over the shared vocabulary
#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityMatcher {
    #[inline]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best match strictly above the threshold; computation failures are
    /// treated as no match
    pub fn find_similar<S: AsRef<str>>(&self, query: &str, corpus: &[S]) -> Option<SimilarQuery> {
        if corpus.is_empty() {
            return None;
        }

        let scores = match similarity_scores(query, corpus) {
            Ok(scores) => scores,
            Err(e) => {
                debug!("Similarity lookup for '{}' skipped: {}", query, e);
                return None;
            }
        };

        let (best_index, best_score) = scores
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (index, score)| match best {
                Some((_, best_score)) if score <= best_score => best,
                _ => Some((index, score)),
            })?;

        if best_score > self.threshold {
            let matched = corpus.get(best_index)?.as_ref().to_string();
            debug!(
                "Query '{}' resembles past query '{}' ({:.3})",
                query, matched, best_score
            );
            Some(SimilarQuery {
                query: matched,
                score: best_score,
            })
        } else {
            None
        }
    }
}

/// Lowercased tokens of two or more word characters
pub fn tokenize(text: &str) -> Result<Vec<String>, SimilarityError> {
    let pattern = TOKEN_PATTERN
        .as_ref()
        .map_err(|e| SimilarityError::Pattern(e.clone()))?;
    let lowered = text.to_lowercase();

    pattern
        .find_iter(&lowered)
        .map(|found| {
            found
                .map(|token| token.as_str().to_string())
                .map_err(|e| SimilarityError::Pattern(e.to_string()))
        })
        .collect()
}

/// Cosine similarity of `query` against every corpus entry, in corpus order.
///
/// The vocabulary and document frequencies are fitted on the corpus plus the
/// query, with smoothed idf `ln((1 + n) / (1 + df)) + 1` and L2-normalised rows.
pub fn similarity_scores<S: AsRef<str>>(
    query: &str,
    corpus: &[S],
) -> Result<Vec<f64>, SimilarityError> {
    let mut documents = corpus
        .iter()
        .map(|entry| tokenize(entry.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    documents.push(tokenize(query)?);

    let mut vocabulary: HashMap<&str, usize> = HashMap::new();
    for token in documents.iter().flatten() {
        let next = vocabulary.len();
        vocabulary.entry(token.as_str()).or_insert(next);
    }
    if vocabulary.is_empty() {
        return Err(SimilarityError::EmptyVocabulary);
    }

    let mut document_frequency = vec![0_usize; vocabulary.len()];
    for document in &documents {
        let mut seen = vec![false; vocabulary.len()];
        for token in document {
            if let Some(&column) = vocabulary.get(token.as_str()) {
                if !seen[column] {
                    seen[column] = true;
                    document_frequency[column] += 1;
                }
            }
        }
    }

    let document_count = documents.len() as f64;
    let idf: Vec<f64> = document_frequency
        .iter()
        .map(|&df| ((1.0 + document_count) / (1.0 + df as f64)).ln() + 1.0)
        .collect();

    let vectors: Vec<Vec<f64>> = documents
        .iter()
        .map(|document| {
            let mut row = vec![0.0; vocabulary.len()];
            for token in document {
                if let Some(&column) = vocabulary.get(token.as_str()) {
                    row[column] += 1.0;
                }
            }
            for (value, weight) in row.iter_mut().zip(&idf) {
                *value *= weight;
            }
            normalize(&mut row);
            row
        })
        .collect();

    let Some((query_vector, corpus_vectors)) = vectors.split_last() else {
        return Ok(Vec::new());
    };

    Ok(corpus_vectors
        .iter()
        .map(|vector| dot(query_vector, vector))
        .collect())
}

fn normalize(row: &mut [f64]) {
    let norm = row.iter().map(|value| value * value).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in row.iter_mut() {
            *value /= norm;
        }
    }
}

#[inline]
fn dot(left: &[f64], right: &[f64]) -> f64 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}
