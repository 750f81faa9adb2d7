use anyhow::Result;
use clap::{Parser, Subcommand};
use engine::cache::ArtifactCache;
use engine::catalog::load_catalog;
use engine::config::DEFAULT_RESULTS;
use engine::{BuildOutcome, Engine, EngineConfig};
use tracing_subscriber::{EnvFilter, fmt};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build similarity artifacts for a movie catalog and query them", long_about = None)]
struct Cli {
    /// Engine configuration (JSON); defaults apply to missing keys
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vectorize the catalog, build the similarity matrix and store it
    Build {
        /// Catalog path (JSON/JSONL file or directory)
        #[arg(long)]
        catalog: PathBuf,
        /// Artifact directory
        #[arg(long)]
        artifacts: PathBuf,
        /// Rebuild even when cached artifacts match the catalog
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Recommend movies similar to a title
    Query {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        artifacts: PathBuf,
        /// Free-text movie title
        #[arg(long)]
        q: String,
        /// Number of recommendations
        #[arg(long, default_value_t = DEFAULT_RESULTS)]
        k: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Build { catalog, artifacts, force } => build(config, &catalog, &artifacts, force),
        Commands::Query { catalog, artifacts, q, k } => query(config, &catalog, &artifacts, &q, k),
    }
}

fn build(config: EngineConfig, catalog: &Path, artifacts: &Path, force: bool) -> Result<()> {
    let items = load_catalog(catalog)?;
    let engine = Engine::new(config)?;
    let cache = ArtifactCache::new(artifacts);
    if force {
        engine.rebuild(&items)?;
        let snapshot = engine.snapshot().ok_or(engine::EngineError::NotReady)?;
        cache.store(&snapshot.terms, &snapshot.similarity, &snapshot.fingerprint)?;
    } else if engine.load_or_build(&items, &cache)? == (BuildOutcome::Built { stored: false }) {
        anyhow::bail!("artifacts were built but could not be stored in {}", artifacts.display());
    }

    let status = engine.status();
    tracing::info!(items = status.items, terms = status.terms, dropped = status.dropped, "artifact build complete");
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn query(config: EngineConfig, catalog: &Path, artifacts: &Path, q: &str, k: usize) -> Result<()> {
    let items = load_catalog(catalog)?;
    let engine = Engine::new(config)?;
    engine.load_or_build(&items, &ArtifactCache::new(artifacts))?;

    let outcome = engine.recommend(q, k)?;
    match &outcome.matched {
        Some(title) => tracing::info!(query = q, matched = %title, "resolved"),
        None => println!("no close match for {q:?}"),
    }
    println!("{}", serde_json::to_string_pretty(&outcome.results)?);
    Ok(())
}
