use anyhow::Result;
use clap::Parser;
use gitea_bridge::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("gitea-bridge startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("gitea-bridge exited cleanly"),
        Err(e) => tracing::error!(error = %e, "gitea-bridge exited with error"),
    }
    result
}
