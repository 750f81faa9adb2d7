use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}]+").expect("valid regex");
}

/// Tokenize a title using NFKC normalization, lowercase, and splitting on non-alphanumeric runs.
/// Stopwords are kept: in titles they carry meaning ("The Thing" vs "Thing").
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}

/// Distinct tokens, ordered.
pub fn token_set(text: &str) -> BTreeSet<String> { tokenize(text).into_iter().collect() }

/// Canonical form used for exact-match lookups and query memo keys.
pub fn normalize(text: &str) -> String { tokenize(text).join(" ") }
