use crate::ranker::Recommendation;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Memo key: normalized query text and requested result count.
pub type QueryKey = (String, usize);

/// Outcome of one query: the title it resolved to and the ranked results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub matched: Option<String>,
    pub results: Vec<Recommendation>,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: usize,
    pub misses: usize,
}

/// LRU memo of recent query results.
///
/// Entries are kept front = oldest, back = newest. Capacity 0 disables caching.
#[derive(Debug)]
pub struct QueryCache {
    capacity: usize,
    entries: VecDeque<(QueryKey, QueryResult)>,
    hits: usize,
    misses: usize,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: VecDeque::with_capacity(capacity), hits: 0, misses: 0 }
    }

    /// Cached result for `key`, marking it most recently used.
    pub fn get(&mut self, key: &QueryKey) -> Option<QueryResult> {
        match self.entries.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                self.hits += 1;
                let entry = self.entries.remove(idx)?;
                let value = entry.1.clone();
                self.entries.push_back(entry);
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: QueryKey, value: QueryResult) {
        if self.capacity == 0 { return; }
        if let Some(idx) = self.entries.iter().position(|(k, _)| *k == key) {
            self.entries.remove(idx);
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, value));
    }

    pub fn clear(&mut self) { self.entries.clear(); }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn stats(&self) -> QueryCacheStats {
        QueryCacheStats { len: self.entries.len(), capacity: self.capacity, hits: self.hits, misses: self.misses }
    }
}
