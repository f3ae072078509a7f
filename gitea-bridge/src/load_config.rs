use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use gitea_bridge_core::config::{BridgeConfig, GiteaConfig, MeshConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
use serde::Deserialize;
use tracing::{error, info};

pub const GITEA_KEY_ENV: &str = "GITEA_KEY";
pub const GITEA_API_ENV: &str = "GITEA_API";

#[derive(Deserialize)]
struct StaticConfig {
    #[serde(default = "default_listen")]
    listen: String,
    #[serde(default)]
    gitea: GiteaSection,
    mesh: MeshSection,
}

#[derive(Deserialize, Default)]
struct GiteaSection {
    #[serde(default)]
    api: Option<String>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
}

#[derive(Deserialize)]
struct MeshSection {
    url: String,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

/// Loads a static YAML config file (no secrets) and injects the Gitea token from the environment.
/// `GITEA_API`, when set, overrides `gitea.api` from the file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BridgeConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let listen: SocketAddr = match static_conf.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = ?e, listen = %static_conf.listen, "Invalid listen address");
            anyhow::bail!("Invalid listen address {:?}: {e}", static_conf.listen);
        }
    };

    let api = match std::env::var(GITEA_API_ENV) {
        Ok(api) if !api.is_empty() => {
            info!("GITEA_API found in env, overriding gitea.api");
            api
        }
        _ => match static_conf.gitea.api {
            Some(api) => api,
            None => {
                error!("gitea.api missing from config and GITEA_API not set");
                anyhow::bail!("gitea.api must be set in the config file or via GITEA_API");
            }
        },
    };

    let key = match std::env::var(GITEA_KEY_ENV) {
        Ok(key) if !key.is_empty() => {
            info!("GITEA_KEY found in env");
            key
        }
        Ok(_) => {
            error!("GITEA_KEY environment variable is empty");
            anyhow::bail!("GITEA_KEY environment variable is empty");
        }
        Err(e) => {
            error!(error = ?e, "GITEA_KEY environment variable not set");
            return Err(anyhow::anyhow!("GITEA_KEY environment variable not set: {e}"));
        }
    };

    let config = BridgeConfig {
        listen,
        gitea: GiteaConfig {
            api,
            key,
            request_timeout_secs: static_conf
                .gitea
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        },
        mesh: MeshConfig {
            url: static_conf.mesh.url,
            request_timeout_secs: static_conf
                .mesh
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        },
    };

    config.trace_loaded();
    Ok(config)
}
