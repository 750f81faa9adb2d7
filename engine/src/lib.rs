pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod matrix;
pub mod query_cache;
pub mod ranker;
pub mod service;
pub mod tokenizer;
pub mod vectorizer;

pub use catalog::{CatalogItem, RawCatalogItem};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use matrix::{SimilarityMatrix, TermMatrix};
pub use query_cache::QueryResult;
pub use ranker::{Recommendation, ScoringWeights};
pub use service::{BuildOutcome, Engine, EngineStatus};
pub use vectorizer::ContentVector;
