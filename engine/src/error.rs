/// Errors surfaced by the recommendation engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid catalog record {index}: field `{field}` {reason}")]
    InvalidCatalog {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("corpus is empty after filtering")]
    EmptyCorpus,

    #[error("vocabulary is empty, no features survived filtering")]
    NoFeatures,

    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),

    #[error("cached artifacts do not match the corpus")]
    ArtifactMismatch,

    #[error("engine is not ready: no corpus snapshot has been built")]
    NotReady,

    #[error("query is empty")]
    EmptyQuery,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn invalid(index: usize, field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidCatalog { index, field, reason: reason.into() }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
