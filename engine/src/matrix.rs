use crate::error::{EngineError, EngineResult};
use crate::vectorizer::ContentVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type TermId = u32;

/// Vocabulary construction rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Keep only the most frequent terms (by total count) when set.
    pub max_features: Option<usize>,
    /// Minimum number of items a term must occur in.
    pub min_df: u32,
}

impl Default for MatrixConfig {
    fn default() -> Self { Self { max_features: None, min_df: 1 } }
}

/// Term-document count matrix; one sparse row per corpus item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermMatrix {
    /// Sorted lexicographically; the position is the term id.
    pub vocabulary: Vec<String>,
    pub df: Vec<u32>,
    /// Row entries sorted by term id.
    pub rows: Vec<Vec<(TermId, u32)>>,
}

impl TermMatrix {
    pub fn num_rows(&self) -> usize { self.rows.len() }
    pub fn num_terms(&self) -> usize { self.vocabulary.len() }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.vocabulary.binary_search_by(|t| t.as_str().cmp(term)).ok().map(|i| i as TermId)
    }

    fn norm(&self, row: usize) -> f64 {
        self.rows[row].iter().map(|&(_, c)| (c as f64) * (c as f64)).sum::<f64>().sqrt()
    }
}

/// Dense symmetric cosine similarity matrix, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    pub fn len(&self) -> usize { self.n }
    pub fn is_empty(&self) -> bool { self.n == 0 }

    /// Panics if `i` is out of range.
    pub fn row(&self, i: usize) -> &[f32] {
        assert!(i < self.n, "similarity row {i} out of range for {} items", self.n);
        &self.values[i * self.n..(i + 1) * self.n]
    }

    pub fn get(&self, i: usize, j: usize) -> f32 { self.row(i)[j] }

    /// Structural check used when loading persisted artifacts.
    pub fn is_well_formed(&self) -> bool { self.values.len() == self.n * self.n }
}

pub fn build(corpus: &[ContentVector], config: &MatrixConfig) -> EngineResult<(TermMatrix, SimilarityMatrix)> {
    if corpus.is_empty() {
        return Err(EngineError::EmptyCorpus);
    }
    let terms = build_term_matrix(corpus, config)?;
    let sim = cosine_similarity(&terms);
    tracing::info!(items = terms.num_rows(), terms = terms.num_terms(), "similarity matrix built");
    Ok((terms, sim))
}

pub fn build_term_matrix(corpus: &[ContentVector], config: &MatrixConfig) -> EngineResult<TermMatrix> {
    if corpus.is_empty() {
        return Err(EngineError::EmptyCorpus);
    }

    // (document frequency, total count) per token
    let mut stats: BTreeMap<&str, (u32, u64)> = BTreeMap::new();
    for v in corpus {
        for (token, &count) in v {
            let e = stats.entry(token.as_str()).or_insert((0, 0));
            e.0 += 1;
            e.1 += count as u64;
        }
    }

    let mut kept: Vec<(&str, u32, u64)> = stats
        .into_iter()
        .filter(|(_, (df, _))| *df >= config.min_df)
        .map(|(t, (df, total))| (t, df, total))
        .collect();
    if let Some(k) = config.max_features {
        if kept.len() > k {
            kept.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
            kept.truncate(k);
            kept.sort_by(|a, b| a.0.cmp(b.0));
        }
    }
    if kept.is_empty() {
        return Err(EngineError::NoFeatures);
    }

    let vocabulary: Vec<String> = kept.iter().map(|(t, _, _)| t.to_string()).collect();
    let df: Vec<u32> = kept.iter().map(|(_, df, _)| *df).collect();
    let dictionary: HashMap<&str, TermId> =
        vocabulary.iter().enumerate().map(|(i, t)| (t.as_str(), i as TermId)).collect();

    let mut empty_rows = 0usize;
    let rows: Vec<Vec<(TermId, u32)>> = corpus
        .iter()
        .map(|v| {
            // BTreeMap iteration is lexicographic, matching term id order
            let row: Vec<(TermId, u32)> =
                v.iter().filter_map(|(t, &c)| dictionary.get(t.as_str()).map(|&id| (id, c))).collect();
            if row.is_empty() { empty_rows += 1; }
            row
        })
        .collect();
    if empty_rows > 0 {
        tracing::warn!(empty_rows, "items lost every term to vocabulary filtering");
    }

    Ok(TermMatrix { vocabulary, df, rows })
}

/// Pairwise cosine similarity over the rows of `terms`.
/// Dot products are accumulated as exact integers through per-term postings.
pub fn cosine_similarity(terms: &TermMatrix) -> SimilarityMatrix {
    let n = terms.num_rows();
    let mut postings: Vec<Vec<(u32, u32)>> = vec![Vec::new(); terms.num_terms()];
    for (row, entries) in terms.rows.iter().enumerate() {
        for &(tid, c) in entries {
            postings[tid as usize].push((row as u32, c));
        }
    }
    let norms: Vec<f64> = (0..n).map(|i| terms.norm(i)).collect();

    let mut values = vec![0.0f32; n * n];
    let mut dots = vec![0u64; n];
    for i in 0..n {
        values[i * n + i] = 1.0;
        if norms[i] == 0.0 { continue; }
        for &(tid, ci) in &terms.rows[i] {
            for &(j, cj) in &postings[tid as usize] {
                let j = j as usize;
                if j > i {
                    dots[j] += ci as u64 * cj as u64;
                }
            }
        }
        for j in (i + 1)..n {
            if dots[j] == 0 { continue; }
            let cos = (dots[j] as f64 / (norms[i] * norms[j])).clamp(0.0, 1.0) as f32;
            values[i * n + j] = cos;
            values[j * n + i] = cos;
            dots[j] = 0;
        }
    }
    SimilarityMatrix { n, values }
}
