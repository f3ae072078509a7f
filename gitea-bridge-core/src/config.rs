use std::fmt;
use std::net::SocketAddr;

use tracing::{debug, info};

/// Default timeout applied to every outbound request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fully merged runtime configuration. Built once at startup, read-only after.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub listen: SocketAddr,
    pub gitea: GiteaConfig,
    pub mesh: MeshConfig,
}

impl BridgeConfig {
    pub fn trace_loaded(&self) {
        info!(
            listen = %self.listen,
            gitea_api = %self.gitea.api,
            mesh_url = %self.mesh.url,
            "Loaded BridgeConfig"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

/// Where and how to reach the Gitea admin API.
#[derive(Clone)]
pub struct GiteaConfig {
    /// API base, e.g. `https://git.example.com/api/v1`.
    pub api: String,
    /// Admin access token sent as `Authorization: token <key>`.
    pub key: String,
    pub request_timeout_secs: u64,
}

// The token never reaches the logs.
impl fmt::Debug for GiteaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GiteaConfig")
            .field("api", &self.api)
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Where the mesh gateway accepts action calls and event broadcasts.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub url: String,
    pub request_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let conf = GiteaConfig {
            api: "https://git.example.com/api/v1".into(),
            key: "top-secret".into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        let shown = format!("{conf:?}");
        assert!(!shown.contains("top-secret"), "token leaked: {shown}");
        assert!(shown.contains("<10 bytes>"));
    }
}
