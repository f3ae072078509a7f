//! Inbound Gitea push webhooks.
//!
//! A delivery carrying a `head_commit` is recorded as a commit on the mesh's
//! repos service, acting as the repository owner. Every delivery, with or
//! without a commit, is then re-broadcast untouched as the `gitea.webhook`
//! domain event.
//!
//! The owner, pusher and repository lookups are independent of each other and
//! run concurrently; the commit creation waits for all three.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::contract::{
    Account, CallMeta, CommitRecord, EventBus, NewCommit, RepositoryRecord, ServiceMesh,
};
use crate::error::{BridgeError, Result};

/// Domain event re-broadcasting every delivery.
pub const WEBHOOK_EVENT: &str = "gitea.webhook";

/// Status given to every commit recorded from a push.
pub const COMMIT_STATUS: &str = "accepted";

/// Action given to every commit recorded from a push.
pub const COMMIT_ACTION: &str = "push";

/// Typed view of the push payload fields the bridge consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
    #[serde(default)]
    pub repository: Option<PayloadRepository>,
    #[serde(default)]
    pub pusher: Option<PayloadUser>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub total_commits: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub added: Option<Vec<String>>,
    #[serde(default)]
    pub removed: Option<Vec<String>>,
    #[serde(default)]
    pub modified: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadRepository {
    pub name: String,
    pub owner: PayloadUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadUser {
    pub username: String,
}

/// What a delivery asks of the bridge.
#[derive(Debug, Clone)]
pub enum PushKind {
    /// No `head_commit`: nothing to record, only re-broadcast.
    NoCommit,
    Commit(CommitPush),
}

/// A push with everything needed to record its head commit.
#[derive(Debug, Clone)]
pub struct CommitPush {
    pub owner_username: String,
    pub pusher_username: String,
    pub repo_name: String,
    pub branch: String,
    pub head: HeadCommit,
    pub total_commits: Option<u64>,
}

/// Result of handling one delivery.
#[derive(Debug, Clone, Default)]
pub struct WebhookOutcome {
    /// The recorded commit, if the delivery carried one.
    pub commit: Option<CommitRecord>,
}

/// Last `/`-delimited segment of a ref: `refs/heads/main` is `main`.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}

/// Decide what a raw delivery asks for.
///
/// Only `head_commit` is inspected when it is absent or null; otherwise the
/// repository, pusher and ref become mandatory.
pub fn classify(raw: &Value) -> Result<PushKind> {
    match raw.get("head_commit") {
        None | Some(Value::Null) => return Ok(PushKind::NoCommit),
        Some(_) => {}
    }

    let payload: WebhookPayload = serde_json::from_value(raw.clone())
        .map_err(|e| BridgeError::invalid_payload(e.to_string()))?;

    let head = payload
        .head_commit
        .ok_or_else(|| BridgeError::invalid_payload("head_commit is malformed"))?;
    let repository = payload
        .repository
        .ok_or_else(|| BridgeError::invalid_payload("repository is missing"))?;
    let pusher = payload
        .pusher
        .ok_or_else(|| BridgeError::invalid_payload("pusher is missing"))?;
    let git_ref = payload
        .git_ref
        .ok_or_else(|| BridgeError::invalid_payload("ref is missing"))?;

    Ok(PushKind::Commit(CommitPush {
        owner_username: repository.owner.username,
        pusher_username: pusher.username,
        repo_name: repository.name,
        branch: branch_from_ref(&git_ref).to_string(),
        head,
        total_commits: payload.total_commits,
    }))
}

/// Handle one webhook delivery.
///
/// The `gitea.webhook` event is emitted even when recording the commit fails;
/// that failure is returned afterwards.
pub async fn handle_push<M, B>(mesh: &M, bus: &B, raw: Value) -> Result<WebhookOutcome>
where
    M: ServiceMesh + ?Sized,
    B: EventBus + ?Sized,
{
    let recorded = match classify(&raw) {
        Ok(PushKind::NoCommit) => {
            debug!("Delivery has no head commit, nothing to record");
            Ok(None)
        }
        Ok(PushKind::Commit(push)) => record_commit(mesh, &push).await.map(Some),
        Err(e) => Err(e),
    };

    // The caller logs whichever error is returned; a recording failure
    // shadowed by a broadcast failure is logged here instead.
    if let Err(e) = bus.emit(WEBHOOK_EVENT, raw).await {
        if let Err(rec) = &recorded {
            warn!(error = %rec, "Commit recording also failed");
        }
        return Err(e);
    }

    Ok(WebhookOutcome { commit: recorded? })
}

/// Resolve owner, pusher and repository, then create the commit record acting as the owner.
pub async fn record_commit<M>(mesh: &M, push: &CommitPush) -> Result<CommitRecord>
where
    M: ServiceMesh + ?Sized,
{
    let (owner, pusher, repo) = futures::try_join!(
        find_account(mesh, &push.owner_username),
        find_account(mesh, &push.pusher_username),
        find_repo(mesh, &push.repo_name),
    )?;

    let commit = NewCommit {
        repo: repo.id,
        name: repo.name,
        status: COMMIT_STATUS.to_string(),
        hash: push.head.id.clone(),
        branch: push.branch.clone(),
        action: COMMIT_ACTION.to_string(),
        message: push.head.message.clone(),
        added: push.head.added.clone().unwrap_or_default(),
        removed: push.head.removed.clone().unwrap_or_default(),
        modified: push.head.modified.clone().unwrap_or_default(),
        commits: push.total_commits,
    };

    let record = mesh
        .create_commit(commit, CallMeta::acting_as(owner.id))
        .await?;

    info!(
        hash = %record.hash,
        commit_id = %record.id,
        pusher = %pusher.username,
        pusher_id = %pusher.id,
        "New commit has been submitted"
    );

    Ok(record)
}

/// First account with exactly this username.
async fn find_account<M>(mesh: &M, username: &str) -> Result<Account>
where
    M: ServiceMesh + ?Sized,
{
    let accounts = mesh.find_accounts(username).await?;
    if accounts.len() > 1 {
        warn!(
            username,
            matches = accounts.len(),
            "Username is ambiguous, using the first account"
        );
    }
    accounts
        .into_iter()
        .next()
        .ok_or_else(|| BridgeError::not_found("account", username))
}

async fn find_repo<M>(mesh: &M, name: &str) -> Result<RepositoryRecord>
where
    M: ServiceMesh + ?Sized,
{
    mesh.get_repo(name)
        .await?
        .ok_or_else(|| BridgeError::not_found("repository", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn branch_is_last_ref_segment() {
        assert_eq!(branch_from_ref("refs/heads/main"), "main");
        assert_eq!(branch_from_ref("refs/heads/feature/login"), "login");
        assert_eq!(branch_from_ref("main"), "main");
    }

    #[test]
    fn null_head_commit_is_no_commit() {
        let kind = classify(&json!({ "head_commit": null, "ref": "refs/tags/v1" })).unwrap();
        assert!(matches!(kind, PushKind::NoCommit));
    }

    #[test]
    fn missing_head_commit_ignores_other_fields() {
        // Not a push shape at all, still only a re-broadcast.
        let kind = classify(&json!({ "action": "created", "repository": 12 })).unwrap();
        assert!(matches!(kind, PushKind::NoCommit));
    }

    #[test]
    fn commit_without_pusher_is_invalid() {
        let err = classify(&json!({
            "head_commit": { "id": "abc" },
            "repository": { "name": "proj", "owner": { "username": "alice" } },
            "ref": "refs/heads/main"
        }))
        .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPayload { .. }), "{err:?}");
    }

    #[test]
    fn null_file_lists_are_accepted() {
        let kind = classify(&json!({
            "head_commit": { "id": "abc", "message": "m", "added": null },
            "repository": { "name": "proj", "owner": { "username": "alice" } },
            "pusher": { "username": "bob" },
            "ref": "refs/heads/dev",
            "total_commits": 2
        }))
        .unwrap();
        match kind {
            PushKind::Commit(push) => {
                assert_eq!(push.branch, "dev");
                assert_eq!(push.owner_username, "alice");
                assert_eq!(push.pusher_username, "bob");
                assert_eq!(push.total_commits, Some(2));
                assert!(push.head.added.is_none());
            }
            PushKind::NoCommit => panic!("expected a commit push"),
        }
    }
}
