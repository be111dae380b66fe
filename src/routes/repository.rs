//! Repository endpoints.
//!
//! - GET /api/v1/repository
//!   Name, root path and current branch of the active session.
//!
//! - POST /api/v1/repository/open { path }
//! - POST /api/v1/repository/init { path }
//! - POST /api/v1/repository/clone { url, path }
//!   Each replaces the active session with one on the resulting repository.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::models::{CloneRepoRequest, InitRepoRequest, OpenRepoRequest, RepositoryInfo};
use crate::session::SharedWorkspace;

pub fn routes(workspace: SharedWorkspace) -> Router {
    Router::new()
        .route("/api/v1/repository", get(get_repository_info))
        .route("/api/v1/repository/open", post(open_repository))
        .route("/api/v1/repository/init", post(init_repository))
        .route("/api/v1/repository/clone", post(clone_repository))
        .with_state(workspace)
}

async fn get_repository_info(State(workspace): State<SharedWorkspace>) -> Result<Json<RepositoryInfo>> {
    let session = workspace.current().await?;
    Ok(Json(session.info().await?))
}

async fn open_repository(
    State(workspace): State<SharedWorkspace>,
    Json(request): Json<OpenRepoRequest>,
) -> Result<Json<RepositoryInfo>> {
    let session = workspace.open(&request.path).await?;
    Ok(Json(session.info().await?))
}

async fn init_repository(
    State(workspace): State<SharedWorkspace>,
    Json(request): Json<InitRepoRequest>,
) -> Result<Json<RepositoryInfo>> {
    let session = workspace.init(&request.path).await?;
    Ok(Json(session.info().await?))
}

async fn clone_repository(
    State(workspace): State<SharedWorkspace>,
    Json(request): Json<CloneRepoRequest>,
) -> Result<Json<RepositoryInfo>> {
    let session = workspace.clone_repo(&request.url, &request.path).await?;
    Ok(Json(session.info().await?))
}
