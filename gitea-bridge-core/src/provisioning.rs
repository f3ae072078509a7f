//! Outbound provisioning: mirror repository lifecycle events from the mesh
//! into Gitea.
//!
//! `repos.created` and `repos.removed` carry the repository under `data`. The
//! owner reference is resolved to an account first, since Gitea addresses
//! repositories by owner username.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::admin::{self, CreateRepoParams, RemoveRepoParams};
use crate::contract::{Account, EntityId, GiteaApi, ServiceMesh};
use crate::error::{BridgeError, Result};

pub const REPO_CREATED_EVENT: &str = "repos.created";
pub const REPO_REMOVED_EVENT: &str = "repos.removed";

/// Body of a repository lifecycle event.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoEvent {
    pub data: RepoRef,
}

/// The repository a lifecycle event is about.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoRef {
    pub name: String,
    /// Id of the owning account.
    pub owner: EntityId,
}

async fn resolve_owner<M>(mesh: &M, repo: &RepoRef) -> Result<Account>
where
    M: ServiceMesh + ?Sized,
{
    mesh.resolve_account(&repo.owner)
        .await?
        .ok_or_else(|| BridgeError::not_found("account", repo.owner.to_string()))
}

/// Create the Gitea repository for a `repos.created` event.
pub async fn on_repo_created<A, M>(api: &A, mesh: &M, event: &RepoEvent) -> Result<Option<Value>>
where
    A: GiteaApi + ?Sized,
    M: ServiceMesh + ?Sized,
{
    let owner = resolve_owner(mesh, &event.data).await?;
    let params = CreateRepoParams::new(owner.username, event.data.name.clone());
    let result = admin::create_repo(api, &params).await?;
    info!(
        owner = %params.username,
        repo = %params.name,
        ?result,
        "Provisioned repository in Gitea"
    );
    Ok(result)
}

/// Delete the Gitea repository for a `repos.removed` event.
pub async fn on_repo_removed<A, M>(api: &A, mesh: &M, event: &RepoEvent) -> Result<bool>
where
    A: GiteaApi + ?Sized,
    M: ServiceMesh + ?Sized,
{
    let owner = resolve_owner(mesh, &event.data).await?;
    let params = RemoveRepoParams {
        username: owner.username,
        name: event.data.name.clone(),
    };
    let result = admin::remove_repo(api, &params).await?;
    info!(
        owner = %params.username,
        repo = %params.name,
        result,
        "Deprovisioned repository in Gitea"
    );
    Ok(result)
}
