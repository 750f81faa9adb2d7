use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use engine::cache::ArtifactCache;
use engine::catalog::load_catalog;
use engine::config::DEFAULT_RESULTS;
use engine::{BuildOutcome, Engine, EngineConfig, EngineError, EngineStatus, QueryResult, Recommendation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct RecommendParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_RESULTS }

#[derive(Serialize, Deserialize)]
pub struct RecommendResponse {
    pub query: String,
    /// Catalog title the query resolved to
    pub matched: Option<String>,
    pub took_s: f64,
    pub total: usize,
    pub results: Vec<Recommendation>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub catalog_path: Option<PathBuf>,
    pub artifacts_root: Option<PathBuf>,
    pub admin_token: Option<String>,
}

/// Where the server gets its corpus from.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub catalog: Option<PathBuf>,
    pub artifacts: Option<PathBuf>,
    pub config: EngineConfig,
}

pub struct ApiError(StatusCode, String);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status = match e {
            EngineError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::EmptyQuery | EngineError::InvalidCatalog { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

/// Build the router, loading the catalog and artifacts when configured.
/// A failed initial build leaves the engine not ready instead of aborting startup.
pub fn build_app(options: AppOptions) -> Result<Router> {
    let engine = Arc::new(Engine::new(options.config)?);
    if let Some(catalog) = &options.catalog {
        if let Err(e) = load_into(&engine, catalog, options.artifacts.as_ref()) {
            tracing::error!(error = %e, catalog = %catalog.display(), "initial build failed, serving not-ready");
        }
    }
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState { engine, catalog_path: options.catalog, artifacts_root: options.artifacts, admin_token }))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .route("/recommend", get(recommend_handler))
        .route("/admin/rebuild", post(rebuild_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn load_into(engine: &Engine, catalog: &PathBuf, artifacts: Option<&PathBuf>) -> Result<BuildOutcome, EngineError> {
    let items = load_catalog(catalog)?;
    match artifacts {
        Some(root) => engine.load_or_build(&items, &ArtifactCache::new(root)),
        None => engine.rebuild(&items).map(|_| BuildOutcome::Built { stored: false }),
    }
}

pub async fn recommend_handler(State(state): State<AppState>, Query(params): Query<RecommendParams>) -> Result<Json<RecommendResponse>, ApiError> {
    let start = std::time::Instant::now();
    let QueryResult { matched, results } = state.engine.recommend(&params.q, params.k)?;
    let elapsed = start.elapsed();
    Ok(Json(RecommendResponse { query: params.q, matched, took_s: elapsed.as_secs_f64(), total: results.len(), results }))
}

async fn ready_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.engine.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn status_handler(State(state): State<AppState>) -> Json<EngineStatus> { Json(state.engine.status()) }

// --- Admin endpoints ---
async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<EngineStatus>, ApiError> {
    authorize(&state, &headers)?;
    let catalog = state
        .catalog_path
        .clone()
        .ok_or_else(|| ApiError(StatusCode::CONFLICT, "no catalog path configured".into()))?;
    let engine = state.engine.clone();
    let artifacts = state.artifacts_root.clone();
    let outcome = tokio::task::spawn_blocking(move || load_into(&engine, &catalog, artifacts.as_ref()))
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;
    tracing::info!(?outcome, "rebuild finished");
    Ok(Json(state.engine.status()))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError(StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
