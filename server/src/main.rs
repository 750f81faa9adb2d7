use anyhow::Result;
use axum::Router;
use clap::Parser;
use engine::EngineConfig;
use server::{build_app, AppOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Catalog path (JSON/JSONL file or directory)
    #[arg(long, env = "CATALOG_PATH")]
    catalog: Option<PathBuf>,
    /// Artifact cache directory
    #[arg(long, env = "ARTIFACTS_DIR", default_value = "./artifacts")]
    artifacts: PathBuf,
    /// Engine configuration (JSON)
    #[arg(long, env = "ENGINE_CONFIG")]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let options = AppOptions { catalog: args.catalog, artifacts: Some(args.artifacts), config };
    let app: Router = tokio::task::spawn_blocking(move || build_app(options)).await??;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
