//! Multi-factor ranking of similar items.
//!
//! The adjusted score of a candidate combines its cosine similarity to the
//! source with bounded bonuses for genre novelty, rating, popularity and
//! distance in release year, minus a penalty for genres already well
//! represented among the picks so far. Picks are made greedily, so the
//! novelty and repetition terms see every earlier recommendation.

use crate::catalog::CatalogItem;
use crate::error::{EngineError, EngineResult};
use crate::matrix::SimilarityMatrix;
use crate::vectorizer::genre_token;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Rating at which the rating bonus starts.
pub const NEUTRAL_RATING: f32 = 5.0;

/// Coefficients of the adjusted score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub similarity: f32,
    pub diversity: f32,
    pub repetition: f32,
    pub rating: f32,
    pub popularity: f32,
    pub era: f32,
    pub diversity_cap: u32,
    pub repetition_cap: u32,
    pub popularity_divisor: f32,
    pub era_cap_years: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            similarity: 0.55,
            diversity: 0.10,
            repetition: 0.05,
            rating: 0.10,
            popularity: 0.10,
            era: 0.10,
            diversity_cap: 3,
            repetition_cap: 4,
            popularity_divisor: 1_000_000.0,
            era_cap_years: 20,
        }
    }
}

impl ScoringWeights {
    /// Weights must form a convex combination in which similarity holds at least 40%.
    pub fn validate(&self) -> EngineResult<()> {
        let weights = [self.similarity, self.diversity, self.repetition, self.rating, self.popularity, self.era];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EngineError::InvalidWeights("weights must be finite and non-negative".into()));
        }
        let sum: f32 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-4 {
            return Err(EngineError::InvalidWeights(format!("weights sum to {sum}, expected 1")));
        }
        if self.similarity < 0.4 {
            return Err(EngineError::InvalidWeights(format!("similarity weight {} is below 0.4", self.similarity)));
        }
        if self.diversity_cap == 0 || self.repetition_cap == 0 || self.era_cap_years == 0 {
            return Err(EngineError::InvalidWeights("caps must be positive".into()));
        }
        if !(self.popularity_divisor.is_finite() && self.popularity_divisor > 0.0) {
            return Err(EngineError::InvalidWeights("popularity divisor must be positive".into()));
        }
        Ok(())
    }

    fn static_bonus(&self, source: &CatalogItem, candidate: &CatalogItem) -> f32 {
        let rating = ((candidate.rating - NEUTRAL_RATING) / (10.0 - NEUTRAL_RATING)).clamp(0.0, 1.0);
        let popularity = (candidate.votes as f32 / self.popularity_divisor).min(1.0);
        let era = ((candidate.year - source.year).unsigned_abs() as f32 / self.era_cap_years as f32).min(1.0);
        self.rating * rating + self.popularity * popularity + self.era * era
    }
}

/// A ranked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub year: i32,
    pub genres: Vec<String>,
    pub rating: f32,
    pub votes: u64,
    pub score: f32,
}

impl Recommendation {
    fn from_item(item: &CatalogItem, score: f32) -> Self {
        Self {
            title: item.title.clone(),
            year: item.year,
            genres: item.genres.clone(),
            rating: item.rating,
            votes: item.votes,
            score,
        }
    }
}

/// Genre coverage of the picks made so far, keyed by genre token so that
/// spelling variants of one genre count once.
#[derive(Default)]
struct GenreTally {
    counts: HashMap<String, u32>,
}

fn genre_keys(genres: &[String]) -> BTreeSet<String> {
    genres.iter().map(|g| genre_token(g)).filter(|t| !t.is_empty()).collect()
}

impl GenreTally {
    fn novelty(&self, genres: &[String], cap: u32) -> f32 {
        let new = genre_keys(genres).iter().filter(|g| !self.counts.contains_key(g.as_str())).count() as u32;
        new.min(cap) as f32 / cap as f32
    }

    fn repetition(&self, genres: &[String], cap: u32) -> f32 {
        let repeats: u32 = genre_keys(genres).iter().map(|g| self.counts.get(g.as_str()).copied().unwrap_or(0)).sum();
        repeats.min(cap) as f32 / cap as f32
    }

    fn record(&mut self, genres: &[String]) {
        for g in genre_keys(genres) {
            *self.counts.entry(g).or_insert(0) += 1;
        }
    }
}

/// Rank items similar to `source`, best first.
///
/// `source` is the row of the resolved title; `None` means the query did not
/// resolve and yields no recommendations. Panics if `source` or `items` do not
/// line up with `similarity`.
pub fn recommend(
    source: Option<usize>,
    items: &[CatalogItem],
    similarity: &SimilarityMatrix,
    max_results: usize,
    weights: &ScoringWeights,
) -> Vec<Recommendation> {
    let Some(source) = source else { return Vec::new() };
    assert_eq!(items.len(), similarity.len(), "catalog and similarity matrix disagree on size");
    let origin = &items[source];
    let row = similarity.row(source);

    // (corpus index, score without the genre terms); first occurrence of a title wins
    let mut seen_titles: HashSet<&str> = HashSet::new();
    seen_titles.insert(origin.title.as_str());
    let mut pool: Vec<(usize, f32)> = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        if idx == source || !seen_titles.insert(item.title.as_str()) { continue; }
        let fixed = weights.similarity * row[idx] + weights.static_bonus(origin, item);
        pool.push((idx, fixed));
    }

    let mut tally = GenreTally::default();
    let mut picked: Vec<Recommendation> = Vec::with_capacity(max_results.min(pool.len()));
    while picked.len() < max_results && !pool.is_empty() {
        let mut best: Option<(usize, f32)> = None;
        for (pos, &(idx, fixed)) in pool.iter().enumerate() {
            let genres = &items[idx].genres;
            let score = fixed + weights.diversity * tally.novelty(genres, weights.diversity_cap)
                - weights.repetition * tally.repetition(genres, weights.repetition_cap);
            // pool is in corpus order, so strict comparison keeps the earliest on ties
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pos, score));
            }
        }
        let Some((pos, score)) = best else { break };
        let (idx, _) = pool.remove(pos);
        tally.record(&items[idx].genres);
        picked.push(Recommendation::from_item(&items[idx], score));
    }

    picked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    picked
}
