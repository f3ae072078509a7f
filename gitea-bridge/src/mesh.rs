//! Mesh gateway client: remote actions and event broadcasts over HTTP.
//!
//! An action `v1.accounts.find` is a `POST <url>/v1/accounts/find` carrying the
//! action params as JSON. The acting user from [`CallMeta`] travels in the
//! `X-User-ID` header. Events go to `POST <url>/events/<name>`.

use std::time::Duration;

use async_trait::async_trait;
use gitea_bridge_core::config::MeshConfig;
use gitea_bridge_core::contract::{
    Account, CallMeta, CommitRecord, EntityId, EventBus, NewCommit, RepositoryRecord, ServiceMesh,
};
use gitea_bridge_core::error::{BridgeError, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info};

pub const USER_ID_HEADER: &str = "X-User-ID";

pub struct MeshGateway {
    http: reqwest::Client,
    url: String,
}

impl MeshGateway {
    pub fn new(conf: &MeshConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(conf.request_timeout_secs))
            .build()
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        info!(url = %conf.url, "Initialized MeshGateway");
        Ok(MeshGateway {
            http,
            url: conf.url.trim_end_matches('/').to_string(),
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/{}", self.url, action.replace('.', "/"))
    }

    async fn call<T>(&self, action: &str, params: Value, meta: &CallMeta) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!(action, "Calling mesh action");
        let mut req = self.http.post(self.action_url(action)).json(&params);
        if let Some(user_id) = &meta.user_id {
            req = req.header(USER_ID_HEADER, user_id.to_string());
        }

        let resp = req.send().await.map_err(|e| {
            error!(action, error = ?e, "Mesh action call failed");
            BridgeError::Transport(e.to_string())
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        if !status.is_success() {
            error!(action, status = status.as_u16(), body = %text, "Mesh action returned an error");
            return Err(BridgeError::Remote {
                status: status.as_u16(),
                body: text,
            });
        }

        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl ServiceMesh for MeshGateway {
    async fn find_accounts(&self, username: &str) -> Result<Vec<Account>> {
        self.call(
            "v1.accounts.find",
            json!({ "query": { "username": username } }),
            &CallMeta::default(),
        )
        .await
    }

    async fn resolve_account(&self, id: &EntityId) -> Result<Option<Account>> {
        self.call("v1.accounts.resolve", json!({ "id": id }), &CallMeta::default())
            .await
    }

    async fn get_repo(&self, name: &str) -> Result<Option<RepositoryRecord>> {
        self.call("v1.repos.getRepo", json!({ "name": name }), &CallMeta::default())
            .await
    }

    async fn create_commit(&self, commit: NewCommit, meta: CallMeta) -> Result<CommitRecord> {
        self.call("v1.repos.commits.create", serde_json::to_value(&commit)?, &meta)
            .await
    }
}

#[async_trait]
impl EventBus for MeshGateway {
    async fn emit(&self, event: &str, payload: Value) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/events/{}", self.url, event))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(event, error = ?e, "Event broadcast failed");
                BridgeError::Transport(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .map_err(|e| BridgeError::Transport(e.to_string()))?;
            return Err(BridgeError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        debug!(event, "Event broadcast");
        Ok(())
    }
}
