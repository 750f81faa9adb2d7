use crate::catalog::CatalogItem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token multiset describing one catalog item.
pub type ContentVector = BTreeMap<String, u32>;

pub const POPULAR_VOTES: u64 = 100_000;
pub const MODERATE_VOTES: u64 = 50_000;

/// Repetitions per token family. Zero disables a family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerWeights {
    pub genre: u32,
    pub year: u32,
    pub rating: u32,
    pub popularity: u32,
}

impl Default for VectorizerWeights {
    fn default() -> Self { Self { genre: 3, year: 1, rating: 1, popularity: 1 } }
}

pub fn genre_token(genre: &str) -> String {
    genre
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn rating_band(rating: f32) -> &'static str {
    if rating >= 8.0 {
        "rating_excellent"
    } else if rating >= 7.0 {
        "rating_good"
    } else if rating >= 6.0 {
        "rating_average"
    } else {
        "rating_poor"
    }
}

pub fn popularity_band(votes: u64) -> &'static str {
    if votes >= POPULAR_VOTES {
        "popular_movie"
    } else if votes >= MODERATE_VOTES {
        "moderate_popularity"
    } else {
        "niche_popularity"
    }
}

fn add(v: &mut ContentVector, token: String, times: u32) {
    if times == 0 || token.is_empty() { return; }
    *v.entry(token).or_insert(0) += times;
}

pub fn vectorize(item: &CatalogItem, w: &VectorizerWeights) -> ContentVector {
    let mut v = ContentVector::new();
    for genre in &item.genres {
        add(&mut v, genre_token(genre), w.genre);
    }
    add(&mut v, format!("year_{}", item.year), w.year);
    add(&mut v, format!("decade_{}", item.year.div_euclid(10) * 10), w.year);
    add(&mut v, rating_band(item.rating).to_string(), w.rating);
    add(&mut v, popularity_band(item.votes).to_string(), w.popularity);
    v
}

/// Items that produced a non-empty vector, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct VectorizedCorpus {
    pub items: Vec<CatalogItem>,
    pub vectors: Vec<ContentVector>,
    /// Titles dropped because their vector came out empty.
    pub dropped: Vec<String>,
}

impl VectorizedCorpus {
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

pub fn vectorize_corpus(items: &[CatalogItem], w: &VectorizerWeights) -> VectorizedCorpus {
    let mut corpus = VectorizedCorpus::default();
    for item in items {
        let v = vectorize(item, w);
        if v.is_empty() {
            tracing::warn!(title = %item.title, "dropping item with empty content vector");
            corpus.dropped.push(item.title.clone());
            continue;
        }
        corpus.items.push(item.clone());
        corpus.vectors.push(v);
    }
    corpus
}
