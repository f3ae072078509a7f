#![doc = "Gitea admin API client: implements the core `GiteaApi` contract over HTTP."]
//
//! # Gitea client
//!
//! [`GiteaClient`] wires the [`GiteaApi`] trait from `gitea-bridge-core` to a
//! real Gitea instance. Every request carries `Authorization: token <key>`
//! and targets `<api>/<path>`.
//!
//! - GET/POST: a non-success status is an error carrying the response text;
//!   a success body that is empty or not JSON comes back as `None`.
//! - DELETE: an empty body is success; any body at all is the error text.

use std::time::Duration;

use async_trait::async_trait;
use gitea_bridge_core::config::GiteaConfig;
use gitea_bridge_core::contract::GiteaApi;
use gitea_bridge_core::error::{BridgeError, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

pub struct GiteaClient {
    http: reqwest::Client,
    api: String,
    key: String,
}

impl GiteaClient {
    pub fn new(conf: &GiteaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(conf.request_timeout_secs))
            .build()
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to build HTTP client for Gitea");
                BridgeError::Transport(e.to_string())
            })?;
        tracing::info!(
            api = %conf.api,
            key_set = !conf.key.is_empty(),
            "Initialized GiteaClient"
        );
        Ok(GiteaClient {
            http,
            api: conf.api.trim_end_matches('/').to_string(),
            key: conf.key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api, path.trim_start_matches('/'))
    }

    fn token(&self) -> String {
        format!("token {}", self.key)
    }

    /// Shared GET/POST response handling.
    async fn read_json(path: &str, resp: reqwest::Response) -> Result<Option<Value>> {
        let status = resp.status();
        let text = resp.text().await.map_err(transport)?;

        if !status.is_success() {
            tracing::error!(path, status = status.as_u16(), body = %text, "Gitea returned an error status");
            return Err(BridgeError::Remote {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(path, error = %e, "Gitea response is not JSON, treating as empty");
                Ok(None)
            }
        }
    }
}

fn transport(e: reqwest::Error) -> BridgeError {
    BridgeError::Transport(e.to_string())
}

#[async_trait]
impl GiteaApi for GiteaClient {
    async fn fetch(&self, path: &str) -> Result<Option<Value>> {
        tracing::debug!(path, "GET Gitea");
        let resp = self
            .http
            .get(self.url(path))
            .header(AUTHORIZATION, self.token())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, path, "Gitea GET failed");
                transport(e)
            })?;
        Self::read_json(path, resp).await
    }

    async fn create(&self, path: &str, body: Value) -> Result<Option<Value>> {
        tracing::debug!(path, "POST Gitea");
        let resp = self
            .http
            .post(self.url(path))
            .header(AUTHORIZATION, self.token())
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&body)?)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, path, "Gitea POST failed");
                transport(e)
            })?;
        Self::read_json(path, resp).await
    }

    async fn remove(&self, path: &str) -> Result<bool> {
        tracing::debug!(path, "DELETE Gitea");
        let resp = self
            .http
            .delete(self.url(path))
            .header(AUTHORIZATION, self.token())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, path, "Gitea DELETE failed");
                transport(e)
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport)?;

        if !text.is_empty() {
            tracing::error!(path, status = status.as_u16(), body = %text, "Gitea rejected delete");
            return Err(BridgeError::Rejected(text));
        }
        if !status.is_success() {
            return Err(BridgeError::Remote {
                status: status.as_u16(),
                body: text,
            });
        }

        tracing::info!(path, "Deleted in Gitea");
        Ok(true)
    }
}
