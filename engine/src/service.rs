use crate::cache::ArtifactCache;
use crate::catalog::CatalogItem;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fuzzy;
use crate::matrix::{self, SimilarityMatrix, TermMatrix};
use crate::query_cache::{QueryCache, QueryCacheStats, QueryResult};
use crate::ranker::{self, Recommendation};
use crate::tokenizer::normalize;
use crate::vectorizer::vectorize_corpus;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;

/// One immutable generation of the catalog and its derived matrices.
#[derive(Debug)]
pub struct Snapshot {
    pub items: Vec<CatalogItem>,
    pub titles: Vec<String>,
    pub terms: TermMatrix,
    pub similarity: SimilarityMatrix,
    pub fingerprint: String,
    pub dropped: Vec<String>,
}

/// How a snapshot was obtained by [`Engine::load_or_build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Cached,
    Built { stored: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub items: usize,
    pub terms: usize,
    pub dropped: usize,
    pub fingerprint: Option<String>,
    pub cached_queries: usize,
    pub query_hits: usize,
    pub query_misses: usize,
}

/// Recommendation engine over the current corpus snapshot.
///
/// Queries read the snapshot through a shared `Arc`; rebuilds construct a new
/// snapshot off to the side and swap it in under the write lock.
pub struct Engine {
    config: EngineConfig,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    queries: Mutex<QueryCache>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let queries = Mutex::new(QueryCache::new(config.query_cache_capacity));
        Ok(Self { config, snapshot: RwLock::new(None), queries })
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> { self.snapshot.read().clone() }

    pub fn is_ready(&self) -> bool { self.snapshot.read().is_some() }

    /// Build a fresh snapshot from `items` and install it.
    pub fn rebuild(&self, items: &[CatalogItem]) -> EngineResult<()> {
        let fingerprint = self.config.artifact_fingerprint(items);
        let snapshot = self.assemble(items, fingerprint, None)?;
        self.install(snapshot);
        Ok(())
    }

    /// Install a snapshot from `cache` when it matches `items`, otherwise build one and store it.
    pub fn load_or_build(&self, items: &[CatalogItem], cache: &ArtifactCache) -> EngineResult<BuildOutcome> {
        let fingerprint = self.config.artifact_fingerprint(items);
        if let Some(pair) = cache.load(&fingerprint) {
            match self.assemble(items, fingerprint.clone(), Some(pair)) {
                Ok(snapshot) => {
                    self.install(snapshot);
                    return Ok(BuildOutcome::Cached);
                }
                Err(e) => tracing::warn!(error = %e, "cached artifacts rejected, rebuilding"),
            }
        }

        let snapshot = self.assemble(items, fingerprint, None)?;
        let stored = match cache.store(&snapshot.terms, &snapshot.similarity, &snapshot.fingerprint) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to store artifacts, continuing in memory");
                false
            }
        };
        self.install(snapshot);
        Ok(BuildOutcome::Built { stored })
    }

    fn assemble(
        &self,
        items: &[CatalogItem],
        fingerprint: String,
        cached: Option<(TermMatrix, SimilarityMatrix)>,
    ) -> EngineResult<Snapshot> {
        let corpus = vectorize_corpus(items, &self.config.vectorizer);
        if corpus.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }
        let (terms, similarity) = match cached {
            Some((terms, sim)) if sim.len() == corpus.len() && terms.num_rows() == corpus.len() => (terms, sim),
            Some(_) => return Err(EngineError::ArtifactMismatch),
            None => matrix::build(&corpus.vectors, &self.config.matrix)?,
        };
        let titles = corpus.items.iter().map(|i| i.title.clone()).collect();
        Ok(Snapshot { items: corpus.items, titles, terms, similarity, fingerprint, dropped: corpus.dropped })
    }

    fn install(&self, snapshot: Snapshot) {
        tracing::info!(
            items = snapshot.items.len(),
            terms = snapshot.terms.num_terms(),
            dropped = snapshot.dropped.len(),
            fingerprint = %snapshot.fingerprint,
            "installed corpus snapshot"
        );
        // memo and pointer change together so no query memoizes against a replaced snapshot
        let mut queries = self.queries.lock();
        *self.snapshot.write() = Some(Arc::new(snapshot));
        queries.clear();
    }

    fn ready_snapshot(&self) -> EngineResult<Arc<Snapshot>> { self.snapshot().ok_or(EngineError::NotReady) }

    /// Canonical title the query resolves to, if any.
    pub fn resolve(&self, query: &str) -> EngineResult<Option<String>> {
        let snapshot = self.ready_snapshot()?;
        Ok(fuzzy::resolve(query, &snapshot.titles, self.config.min_confidence).map(str::to_string))
    }

    /// Recommendations for a free-text title. A query that does not resolve yields an empty list.
    pub fn find_similar(&self, query: &str, count: usize) -> EngineResult<Vec<Recommendation>> {
        self.recommend(query, count).map(|r| r.results)
    }

    /// Resolve `query` and rank against the same snapshot, returning the matched
    /// title along with the results. Both are memoized together.
    pub fn recommend(&self, query: &str, count: usize) -> EngineResult<QueryResult> {
        let snapshot = self.ready_snapshot()?;
        let normalized = normalize(query);
        if normalized.is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        let count = self.config.clamp_results(count);
        let key = (normalized, count);
        if let Some(hit) = self.queries.lock().get(&key) {
            tracing::debug!(query, count, "query memo hit");
            return Ok(hit);
        }

        let source = fuzzy::resolve_index(query, &snapshot.titles, self.config.min_confidence);
        match source {
            Some(idx) => tracing::debug!(query, matched = %snapshot.titles[idx], "query resolved"),
            None => tracing::info!(query, "no confident title match"),
        }
        let results = ranker::recommend(source, &snapshot.items, &snapshot.similarity, count, &self.config.scoring);
        let outcome = QueryResult { matched: source.map(|idx| snapshot.titles[idx].clone()), results };

        let mut queries = self.queries.lock();
        if self.snapshot().is_some_and(|live| Arc::ptr_eq(&live, &snapshot)) {
            queries.insert(key, outcome.clone());
        }
        Ok(outcome)
    }

    pub fn query_stats(&self) -> QueryCacheStats { self.queries.lock().stats() }

    pub fn status(&self) -> EngineStatus {
        let snapshot = self.snapshot();
        let stats = self.query_stats();
        EngineStatus {
            ready: snapshot.is_some(),
            items: snapshot.as_ref().map_or(0, |s| s.items.len()),
            terms: snapshot.as_ref().map_or(0, |s| s.terms.num_terms()),
            dropped: snapshot.as_ref().map_or(0, |s| s.dropped.len()),
            fingerprint: snapshot.as_ref().map(|s| s.fingerprint.clone()),
            cached_queries: stats.len,
            query_hits: stats.hits,
            query_misses: stats.misses,
        }
    }
}
