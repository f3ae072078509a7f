//! Administrative actions: user and repository CRUD passed straight through to
//! the Gitea admin API.
//!
//! Each action takes a typed parameter struct (deserializable from an action
//! call's JSON params), validates it, and issues exactly one [`GiteaApi`] call.
//!
//! | Action        | Method | Path                           |
//! |---------------|--------|--------------------------------|
//! | `list_users`  | GET    | `admin/users`                  |
//! | `create_user` | POST   | `admin/users`                  |
//! | `remove_user` | DELETE | `admin/users/{username}`       |
//! | `get_repo`    | GET    | `repos/{username}/{repo}`      |
//! | `create_repo` | POST   | `admin/users/{username}/repos` |
//! | `remove_repo` | DELETE | `repos/{username}/{name}`      |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::contract::GiteaApi;
use crate::error::{BridgeError, Result};

/// Account visibility accepted by `create_user`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Limited,
    #[default]
    Private,
}

/// Trust model accepted by `create_repo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustModel {
    #[default]
    Default,
    Collaborator,
    Committer,
    CollaboratorCommitter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserParams {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub login_name: Option<String>,
    /// Accepted for validation only; users are always created private.
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
    full_name: &'a str,
    login_name: &'a str,
    must_change_password: bool,
    restricted: bool,
    send_notify: bool,
    visibility: Visibility,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveUserParams {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRepoParams {
    pub username: String,
    pub repo: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRepoParams {
    pub name: String,
    pub username: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default = "default_true")]
    pub auto_init: bool,
    #[serde(default = "default_true")]
    pub private: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gitignores: Option<String>,
    #[serde(default)]
    pub issue_labels: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub readme: Option<String>,
    #[serde(default)]
    pub trust_model: TrustModel,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

impl CreateRepoParams {
    /// Parameters for `username/name` with every optional field at its default.
    pub fn new(username: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            default_branch: default_branch(),
            auto_init: true,
            private: true,
            description: None,
            gitignores: None,
            issue_labels: None,
            license: None,
            readme: None,
            trust_model: TrustModel::Default,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateRepoBody<'a> {
    auto_init: bool,
    default_branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gitignores: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue_labels: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license: Option<&'a str>,
    name: &'a str,
    private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    readme: Option<&'a str>,
    template: bool,
    trust_model: TrustModel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveRepoParams {
    pub username: String,
    pub name: String,
}

/// A required value that ends up as a single path segment.
fn require_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(BridgeError::invalid_params(format!("'{field}' is required")));
    }
    if value == "." || value == ".." {
        return Err(BridgeError::invalid_params(format!(
            "'{field}' must not be a relative path segment"
        )));
    }
    if let Some(c) = value.chars().find(|c| matches!(c, '/' | '\\' | '?' | '#' | '%')) {
        return Err(BridgeError::invalid_params(format!(
            "'{field}' must not contain '{c}'"
        )));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(BridgeError::invalid_params(format!("'{field}' is required")));
    }
    Ok(())
}

/// Falls back to `fallback` when `value` is absent or empty.
fn or_fallback<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
}

pub async fn list_users<A>(api: &A) -> Result<Option<Value>>
where
    A: GiteaApi + ?Sized,
{
    api.fetch("admin/users").await
}

/// Create a Gitea user.
///
/// `full_name` and `login_name` default to `username`. The user is always
/// created restricted, private and notified, without a forced password change.
pub async fn create_user<A>(api: &A, params: &CreateUserParams) -> Result<Option<Value>>
where
    A: GiteaApi + ?Sized,
{
    require("email", &params.email)?;
    require_segment("username", &params.username)?;
    require("password", &params.password)?;

    if params.visibility != Visibility::Private {
        debug!(
            username = %params.username,
            requested = ?params.visibility,
            "Ignoring requested visibility, users are created private"
        );
    }

    let body = CreateUserBody {
        email: &params.email,
        username: &params.username,
        password: &params.password,
        full_name: or_fallback(&params.full_name, &params.username),
        login_name: or_fallback(&params.login_name, &params.username),
        must_change_password: false,
        restricted: true,
        send_notify: true,
        visibility: Visibility::Private,
    };

    info!(username = %params.username, "Creating Gitea user");
    api.create("admin/users", serde_json::to_value(&body)?).await
}

pub async fn remove_user<A>(api: &A, params: &RemoveUserParams) -> Result<bool>
where
    A: GiteaApi + ?Sized,
{
    require_segment("username", &params.username)?;
    info!(username = %params.username, "Removing Gitea user");
    api.remove(&format!("admin/users/{}", params.username)).await
}

pub async fn get_repo<A>(api: &A, params: &GetRepoParams) -> Result<Option<Value>>
where
    A: GiteaApi + ?Sized,
{
    require_segment("username", &params.username)?;
    require_segment("repo", &params.repo)?;
    api.fetch(&format!("repos/{}/{}", params.username, params.repo))
        .await
}

/// Create a repository owned by `params.username`. Never created from a template.
pub async fn create_repo<A>(api: &A, params: &CreateRepoParams) -> Result<Option<Value>>
where
    A: GiteaApi + ?Sized,
{
    require_segment("name", &params.name)?;
    require_segment("username", &params.username)?;

    let body = CreateRepoBody {
        auto_init: params.auto_init,
        default_branch: &params.default_branch,
        description: params.description.as_deref(),
        gitignores: params.gitignores.as_deref(),
        issue_labels: params.issue_labels.as_deref(),
        license: params.license.as_deref(),
        name: &params.name,
        private: params.private,
        readme: params.readme.as_deref(),
        template: false,
        trust_model: params.trust_model,
    };

    info!(owner = %params.username, repo = %params.name, "Creating Gitea repository");
    api.create(
        &format!("admin/users/{}/repos", params.username),
        serde_json::to_value(&body)?,
    )
    .await
}

pub async fn remove_repo<A>(api: &A, params: &RemoveRepoParams) -> Result<bool>
where
    A: GiteaApi + ?Sized,
{
    require_segment("username", &params.username)?;
    require_segment("name", &params.name)?;
    info!(owner = %params.username, repo = %params.name, "Removing Gitea repository");
    api.remove(&format!("repos/{}/{}", params.username, params.name))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockGiteaApi;
    use serde_json::json;

    fn user(username: &str) -> CreateUserParams {
        CreateUserParams {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            password: "hunter22".to_string(),
            full_name: None,
            login_name: None,
            visibility: Visibility::Private,
        }
    }

    #[tokio::test]
    async fn create_user_defaults_names_from_username_and_forces_private() {
        let mut api = MockGiteaApi::new();
        api.expect_create()
            .times(1)
            .withf(|path: &str, body: &Value| {
                path == "admin/users"
                    && body["full_name"] == "alice"
                    && body["login_name"] == "alice"
                    && body["visibility"] == "private"
                    && body["must_change_password"] == false
                    && body["restricted"] == true
                    && body["send_notify"] == true
            })
            .returning(|_, _| Ok(Some(json!({ "id": 1, "login": "alice" }))));

        let mut params = user("alice");
        params.visibility = Visibility::Public;
        let created = create_user(&api, &params).await.unwrap();
        assert_eq!(created, Some(json!({ "id": 1, "login": "alice" })));
    }

    #[tokio::test]
    async fn create_user_keeps_explicit_names() {
        let mut api = MockGiteaApi::new();
        api.expect_create()
            .withf(|_, body: &Value| {
                body["full_name"] == "Alice Liddell" && body["login_name"] == "aliddell"
            })
            .returning(|_, _| Ok(None));

        let mut params = user("alice");
        params.full_name = Some("Alice Liddell".into());
        params.login_name = Some("aliddell".into());
        create_user(&api, &params).await.unwrap();
    }

    #[tokio::test]
    async fn create_user_rejects_missing_password_without_calling_api() {
        let api = MockGiteaApi::new();
        let mut params = user("alice");
        params.password.clear();
        let err = create_user(&api, &params).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidParams { .. }), "{err:?}");
    }

    #[test]
    fn visibility_outside_value_set_fails_to_parse() {
        let raw = json!({
            "email": "a@example.com",
            "username": "a",
            "password": "p",
            "visibility": "secret"
        });
        assert!(serde_json::from_value::<CreateUserParams>(raw).is_err());
    }

    #[tokio::test]
    async fn create_repo_applies_defaults_and_disables_template() {
        let mut api = MockGiteaApi::new();
        api.expect_create()
            .times(1)
            .withf(|path: &str, body: &Value| {
                path == "admin/users/bob/repos"
                    && *body
                        == json!({
                            "auto_init": true,
                            "default_branch": "main",
                            "name": "proj",
                            "private": true,
                            "template": false,
                            "trust_model": "default"
                        })
            })
            .returning(|_, _| Ok(Some(json!({ "id": 3 }))));

        let params: CreateRepoParams =
            serde_json::from_value(json!({ "name": "proj", "username": "bob" })).unwrap();
        create_repo(&api, &params).await.unwrap();
    }

    #[test]
    fn trust_model_parses_combined_value() {
        let params: CreateRepoParams = serde_json::from_value(json!({
            "name": "proj",
            "username": "bob",
            "trust_model": "collaboratorcommitter"
        }))
        .unwrap();
        assert_eq!(params.trust_model, TrustModel::CollaboratorCommitter);
    }

    #[tokio::test]
    async fn remove_and_get_build_expected_paths() {
        let mut api = MockGiteaApi::new();
        api.expect_remove()
            .withf(|path: &str| path == "admin/users/carol")
            .times(1)
            .returning(|_| Ok(true));
        api.expect_remove()
            .withf(|path: &str| path == "repos/carol/site")
            .times(1)
            .returning(|_| Ok(true));
        api.expect_fetch()
            .withf(|path: &str| path == "repos/carol/site")
            .times(1)
            .returning(|_| Ok(Some(json!({ "name": "site" }))));
        api.expect_fetch()
            .withf(|path: &str| path == "admin/users")
            .times(1)
            .returning(|_| Ok(Some(json!([]))));

        let removed = remove_user(
            &api,
            &RemoveUserParams {
                username: "carol".into(),
            },
        )
        .await
        .unwrap();
        assert!(removed);

        let removed = remove_repo(
            &api,
            &RemoveRepoParams {
                username: "carol".into(),
                name: "site".into(),
            },
        )
        .await
        .unwrap();
        assert!(removed);

        let repo = get_repo(
            &api,
            &GetRepoParams {
                username: "carol".into(),
                repo: "site".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(repo, Some(json!({ "name": "site" })));

        assert_eq!(list_users(&api).await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn path_segments_with_slashes_are_rejected() {
        let api = MockGiteaApi::new();
        let err = remove_repo(
            &api,
            &RemoveRepoParams {
                username: "carol".into(),
                name: "../admin".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn relative_segments_never_reach_the_api() {
        // No expectations: any call panics the mock.
        let api = MockGiteaApi::new();

        for username in [".", ".."] {
            let err = get_repo(
                &api,
                &GetRepoParams {
                    username: username.into(),
                    repo: "user".into(),
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, BridgeError::InvalidParams { .. }), "{username}: {err:?}");
        }
    }

    #[tokio::test]
    async fn query_and_fragment_characters_are_rejected() {
        let api = MockGiteaApi::new();

        for username in ["bob?purge=true", "bob#frag", "%2E%2E", "bob\\admin"] {
            let err = remove_user(
                &api,
                &RemoveUserParams {
                    username: username.into(),
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, BridgeError::InvalidParams { .. }), "{username}: {err:?}");
        }
    }

    #[tokio::test]
    async fn dotted_names_are_still_accepted() {
        let mut api = MockGiteaApi::new();
        api.expect_fetch()
            .withf(|path: &str| path == "repos/bob/site.github.io")
            .times(1)
            .returning(|_| Ok(None));

        get_repo(
            &api,
            &GetRepoParams {
                username: "bob".into(),
                repo: "site.github.io".into(),
            },
        )
        .await
        .unwrap();
    }
}
