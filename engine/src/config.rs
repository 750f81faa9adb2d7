//! Tuning constants and the engine configuration bundle.
//!
//! Defaults live here; deployments override them with a JSON file loaded through
//! [`EngineConfig::from_json_file`]. Missing keys fall back to the defaults.

use crate::catalog::{corpus_fingerprint, CatalogItem};
use crate::error::{EngineError, EngineResult};
use crate::matrix::MatrixConfig;
use crate::ranker::ScoringWeights;
use crate::vectorizer::VectorizerWeights;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::path::Path;

/// Minimum fuzzy-match confidence (0–100) for a query to resolve.
pub const DEFAULT_MIN_CONFIDENCE: u8 = 60;

/// Smallest number of recommendations a query may ask for.
pub const MIN_RESULTS: usize = 5;

/// Largest number of recommendations a query may ask for.
pub const MAX_RESULTS: usize = 20;

/// Result count used when the caller does not specify one.
pub const DEFAULT_RESULTS: usize = 10;

/// Number of recent query results memoized per engine.
pub const DEFAULT_QUERY_CACHE_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub vectorizer: VectorizerWeights,
    pub matrix: MatrixConfig,
    pub scoring: ScoringWeights,
    pub min_confidence: u8,
    pub min_results: usize,
    pub max_results: usize,
    pub default_results: usize,
    pub query_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerWeights::default(),
            matrix: MatrixConfig::default(),
            scoring: ScoringWeights::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_results: MIN_RESULTS,
            max_results: MAX_RESULTS,
            default_results: DEFAULT_RESULTS,
            query_cache_capacity: DEFAULT_QUERY_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.scoring.validate()?;
        if self.min_confidence > 100 {
            return Err(EngineError::InvalidWeights(format!("min_confidence {} exceeds 100", self.min_confidence)));
        }
        if self.min_results == 0 || self.min_results > self.max_results {
            return Err(EngineError::InvalidWeights(format!(
                "result bounds {}..={} are empty",
                self.min_results, self.max_results
            )));
        }
        Ok(())
    }

    /// Clamp a requested result count into the configured range.
    pub fn clamp_results(&self, requested: usize) -> usize { requested.clamp(self.min_results, self.max_results) }

    /// Key for cached artifacts: the corpus fingerprint plus every setting that
    /// changes the term or similarity matrix. Scoring and query settings are
    /// applied at query time and are left out.
    pub fn artifact_fingerprint(&self, items: &[CatalogItem]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(corpus_fingerprint(items).as_bytes());
        let v = &self.vectorizer;
        for weight in [v.genre, v.year, v.rating, v.popularity] {
            hasher.update(weight.to_le_bytes());
        }
        match self.matrix.max_features {
            Some(k) => {
                hasher.update([1u8]);
                hasher.update((k as u64).to_le_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.matrix.min_df.to_le_bytes());
        format!("{:x}", hasher.finalize())
    }
}
