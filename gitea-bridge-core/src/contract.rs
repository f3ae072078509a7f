//! # contract: collaborator interfaces and the records they exchange
//!
//! The bridge talks to two remote systems, and this module names both of them
//! as traits so the handlers never see a transport:
//!
//! - [`GiteaApi`]: the Gitea administrative REST API (fetch/create/remove by path).
//! - [`ServiceMesh`]: remote actions on other mesh services (accounts, repos, commits).
//! - [`EventBus`]: broadcasting domain events to whoever listens.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so `MockGiteaApi`, `MockServiceMesh`
//!   and `MockEventBus` are available to unit tests and, with the
//!   `test-export-mocks` feature (on by default), to dependent crates.
//!
//! ## Records
//! - [`Account`], [`RepositoryRecord`] and [`CommitRecord`] are owned by remote
//!   services; they are resolved here, never stored.
//! - [`NewCommit`] plus [`CallMeta`] form one `repos.commits.create` call.

use std::fmt;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Identifier of a mesh entity. Services hand out either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Num(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Num(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Num(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_owned())
    }
}

/// An account known to the mesh's accounts service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: EntityId,
    pub username: String,
}

/// A repository known to the mesh's repos service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: EntityId,
    pub name: String,
}

/// Parameters of a `repos.commits.create` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCommit {
    /// Id of the repository record the commit belongs to.
    pub repo: EntityId,
    /// Repository name.
    pub name: String,
    pub status: String,
    pub hash: String,
    pub branch: String,
    pub action: String,
    pub message: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    /// Number of commits in the push.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commits: Option<u64>,
}

/// A commit record as returned by the repos service after creation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitRecord {
    pub id: EntityId,
    #[serde(default)]
    pub hash: String,
}

/// Context travelling alongside an action call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallMeta {
    /// The account the call acts on behalf of.
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
}

impl CallMeta {
    pub fn acting_as(user_id: EntityId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

/// Authenticated access to the Gitea administrative REST API.
///
/// Paths are relative to the configured API base (e.g. `admin/users`).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait GiteaApi: Send + Sync {
    /// GET a path. An empty or non-JSON success body yields `None`.
    async fn fetch(&self, path: &str) -> Result<Option<Value>>;

    /// POST a JSON body to a path. Response handling matches [`GiteaApi::fetch`].
    async fn create(&self, path: &str, body: Value) -> Result<Option<Value>>;

    /// DELETE a path. An empty response body means success; any other body
    /// is returned as [`crate::BridgeError::Rejected`].
    async fn remove(&self, path: &str) -> Result<bool>;
}

/// Remote actions on other mesh services (all `v1`).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ServiceMesh: Send + Sync {
    /// `accounts.find` filtered by exact username; order as returned by the service.
    async fn find_accounts(&self, username: &str) -> Result<Vec<Account>>;

    /// `accounts.resolve` by id.
    async fn resolve_account(&self, id: &EntityId) -> Result<Option<Account>>;

    /// `repos.getRepo` by name.
    async fn get_repo(&self, name: &str) -> Result<Option<RepositoryRecord>>;

    /// `repos.commits.create`, acting as `meta.user_id`.
    async fn create_commit(&self, commit: NewCommit, meta: CallMeta) -> Result<CommitRecord>;
}

/// Broadcast side of the mesh's event bus.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn emit(&self, event: &str, payload: Value) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_id_accepts_numbers_and_strings() {
        let n: EntityId = serde_json::from_value(json!(7)).unwrap();
        let s: EntityId = serde_json::from_value(json!("acc-7")).unwrap();
        assert_eq!(n, EntityId::Num(7));
        assert_eq!(s, EntityId::Text("acc-7".into()));
        assert_eq!(n.to_string(), "7");
        assert_eq!(s.to_string(), "acc-7");
    }

    #[test]
    fn call_meta_serializes_user_id_as_user_id_key() {
        let meta = CallMeta::acting_as(7.into());
        assert_eq!(serde_json::to_value(&meta).unwrap(), json!({ "userID": 7 }));
        assert_eq!(serde_json::to_value(CallMeta::default()).unwrap(), json!({}));
    }
}
