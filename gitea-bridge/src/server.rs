//! axum router and HTTP handlers.
//!
//! Routes:
//! - `POST   /`                          - Gitea push webhook (always `200 {}`)
//! - `GET    /users`                     - list users
//! - `POST   /users`                     - create user
//! - `DELETE /users/{username}`          - remove user
//! - `GET    /repos/{username}/{repo}`   - get repository
//! - `POST   /repos`                     - create repository
//! - `DELETE /repos/{username}/{name}`   - remove repository
//! - `POST   /events/repos.created`      - repository lifecycle event from the bus
//! - `POST   /events/repos.removed`      - repository lifecycle event from the bus
//! - `GET    /healthz`                   - liveness

use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use gitea_bridge_core::admin::{
    self, CreateRepoParams, CreateUserParams, GetRepoParams, RemoveRepoParams, RemoveUserParams,
};
use gitea_bridge_core::contract::{EventBus, GiteaApi, ServiceMesh};
use gitea_bridge_core::provisioning::{self, RepoEvent, REPO_CREATED_EVENT, REPO_REMOVED_EVENT};
use gitea_bridge_core::webhook;
use gitea_bridge_core::BridgeError;
use serde_json::{json, Value};
use tokio::signal;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn GiteaApi>,
    pub mesh: Arc<dyn ServiceMesh>,
    pub bus: Arc<dyn EventBus>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_webhook))
        .route("/users", get(handle_list_users).post(handle_create_user))
        .route("/users/{username}", delete(handle_remove_user))
        .route("/repos", post(handle_create_repo))
        .route("/repos/{username}/{repo}", get(handle_get_repo).delete(handle_remove_repo))
        .route("/events/repos.created", post(handle_repo_created))
        .route("/events/repos.removed", post(handle_repo_removed))
        .route("/healthz", get(handle_health))
        .with_state(state)
}

/// Bind `listen` and serve until SIGINT/SIGTERM.
pub async fn serve(listen: std::net::SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen}"))?;

    info!(%listen, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// `POST /`
///
/// Answers before the delivery is processed; processing failures only reach the logs.
async fn handle_webhook(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let delivery_id = Uuid::new_v4();

    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(%delivery_id, error = %e, "Webhook body is not JSON, ignoring delivery");
            return Json(json!({}));
        }
    };

    let span = info_span!("webhook", %delivery_id);
    tokio::spawn(
        async move {
            match webhook::handle_push(&*state.mesh, &*state.bus, raw).await {
                Ok(outcome) => info!(recorded = outcome.commit.is_some(), "Webhook delivery handled"),
                Err(e) => error!(error = %e, "Webhook delivery failed"),
            }
        }
        .instrument(span),
    );

    Json(json!({}))
}

// ---------------------------------------------------------------------------
// Administrative actions
// ---------------------------------------------------------------------------

async fn handle_list_users(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let users = admin::list_users(&*state.api).await?;
    Ok(Json(users.unwrap_or(Value::Null)))
}

async fn handle_create_user(
    State(state): State<AppState>,
    Json(params): Json<CreateUserParams>,
) -> Result<Json<Value>, ApiError> {
    let user = admin::create_user(&*state.api, &params).await?;
    Ok(Json(user.unwrap_or(Value::Null)))
}

async fn handle_remove_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = admin::remove_user(&*state.api, &RemoveUserParams { username }).await?;
    Ok(Json(json!(removed)))
}

async fn handle_get_repo(
    State(state): State<AppState>,
    Path((username, repo)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let found = admin::get_repo(&*state.api, &GetRepoParams { username, repo }).await?;
    Ok(Json(found.unwrap_or(Value::Null)))
}

async fn handle_create_repo(
    State(state): State<AppState>,
    Json(params): Json<CreateRepoParams>,
) -> Result<Json<Value>, ApiError> {
    let repo = admin::create_repo(&*state.api, &params).await?;
    Ok(Json(repo.unwrap_or(Value::Null)))
}

async fn handle_remove_repo(
    State(state): State<AppState>,
    Path((username, name)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let removed = admin::remove_repo(&*state.api, &RemoveRepoParams { username, name }).await?;
    Ok(Json(json!(removed)))
}

// ---------------------------------------------------------------------------
// Domain events
// ---------------------------------------------------------------------------

/// `POST /events/repos.created`
async fn handle_repo_created(
    State(state): State<AppState>,
    Json(event): Json<RepoEvent>,
) -> (StatusCode, Json<Value>) {
    let span = info_span!("event", name = REPO_CREATED_EVENT, repo = %event.data.name);
    tokio::spawn(
        async move {
            if let Err(e) = provisioning::on_repo_created(&*state.api, &*state.mesh, &event).await {
                error!(error = %e, "Repository provisioning failed");
            }
        }
        .instrument(span),
    );
    (StatusCode::ACCEPTED, Json(json!({})))
}

/// `POST /events/repos.removed`
async fn handle_repo_removed(
    State(state): State<AppState>,
    Json(event): Json<RepoEvent>,
) -> (StatusCode, Json<Value>) {
    let span = info_span!("event", name = REPO_REMOVED_EVENT, repo = %event.data.name);
    tokio::spawn(
        async move {
            if let Err(e) = provisioning::on_repo_removed(&*state.api, &*state.mesh, &event).await {
                error!(error = %e, "Repository deprovisioning failed");
            }
        }
        .instrument(span),
    );
    (StatusCode::ACCEPTED, Json(json!({})))
}

async fn handle_health() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Maps core errors onto HTTP responses.
pub struct ApiError(BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BridgeError::InvalidParams { .. } | BridgeError::InvalidPayload { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BridgeError::NotFound { .. } => StatusCode::NOT_FOUND,
            BridgeError::Remote { .. }
            | BridgeError::Rejected(_)
            | BridgeError::Transport(_)
            | BridgeError::Decode(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(error = %self.0, "administrative action failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
