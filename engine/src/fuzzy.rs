//! Approximate title matching.
//!
//! Scores follow the token-set ratio: both sides are reduced to sets of
//! normalized tokens, so word order, repeated words, case and punctuation do
//! not matter, and a query whose words are all contained in a title scores 100.

use crate::tokenizer::token_set;
use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

/// Similarity of two strings in `[0, 100]`.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() { return 0; }
    (normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// Token-set ratio of two raw strings in `[0, 100]`.
pub fn token_set_ratio(a: &str, b: &str) -> u8 { token_set_ratio_sets(&token_set(a), &token_set(b)) }

fn token_set_ratio_sets(a: &BTreeSet<String>, b: &BTreeSet<String>) -> u8 {
    if a.is_empty() || b.is_empty() { return 0; }
    let sect = join(a.intersection(b));
    let combined_ab = concat(&sect, &join(a.difference(b)));
    let combined_ba = concat(&sect, &join(b.difference(a)));
    ratio(&sect, &combined_ab)
        .max(ratio(&sect, &combined_ba))
        .max(ratio(&combined_ab, &combined_ba))
}

fn join<'a>(tokens: impl Iterator<Item = &'a String>) -> String {
    tokens.map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn concat(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// A scored match against the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleMatch {
    pub index: usize,
    pub score: u8,
}

/// Best match for `query` among `titles`, regardless of confidence.
/// The first candidate with the highest score wins.
pub fn best_match<S: AsRef<str>>(query: &str, titles: &[S]) -> Option<TitleMatch> {
    let query_tokens = token_set(query);
    if query_tokens.is_empty() || titles.is_empty() { return None; }

    let mut best: Option<TitleMatch> = None;
    for (index, title) in titles.iter().enumerate() {
        let score = token_set_ratio_sets(&query_tokens, &token_set(title.as_ref()));
        if best.map_or(true, |b| score > b.score) {
            best = Some(TitleMatch { index, score });
            if score == 100 { break; }
        }
    }
    best
}

/// Index of the best match whose confidence reaches `min_confidence`.
pub fn resolve_index<S: AsRef<str>>(query: &str, titles: &[S], min_confidence: u8) -> Option<usize> {
    best_match(query, titles).filter(|m| m.score >= min_confidence).map(|m| m.index)
}

/// Canonical title for `query`, or `None` on a blank query, empty candidates, or low confidence.
pub fn resolve<'a, S: AsRef<str>>(query: &str, titles: &'a [S], min_confidence: u8) -> Option<&'a str> {
    resolve_index(query, titles, min_confidence).map(|i| titles[i].as_ref())
}
