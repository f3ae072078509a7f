//! CLI glue for gitea-bridge: argument parsing and wiring of the concrete
//! clients into the HTTP server.
//!
//! All request handling lives in `gitea-bridge-core`; this module only builds
//! [`GiteaClient`] and [`MeshGateway`] from the loaded config and hands them to
//! [`server::serve`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::gitea::GiteaClient;
use crate::load_config::load_config;
use crate::mesh::MeshGateway;
use crate::server::{self, AppState};

/// Bridge between Gitea and the service mesh.
#[derive(Parser)]
#[clap(
    name = "gitea-bridge",
    version,
    about = "Translate Gitea webhooks into mesh events and mesh events into Gitea admin calls"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the webhook, admin and event endpoints using the given config file
    Serve {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Load and validate the config file and environment, then exit
    CheckConfig {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Serve { config } => {
            let config = load_config(config)?;
            let api = GiteaClient::new(&config.gitea)?;
            let gateway = Arc::new(MeshGateway::new(&config.mesh)?);
            let state = AppState {
                api: Arc::new(api),
                mesh: gateway.clone(),
                bus: gateway,
            };
            tracing::info!(command = "serve", "Starting gitea-bridge");
            server::serve(config.listen, state).await
        }
        Commands::CheckConfig { config } => {
            let config = load_config(config)?;
            println!("Config OK");
            println!("listen:    {}", config.listen);
            println!("gitea.api: {}", config.gitea.api);
            println!("gitea.key: <{} bytes>", config.gitea.key.len());
            println!("mesh.url:  {}", config.mesh.url);
            Ok(())
        }
    }
}
