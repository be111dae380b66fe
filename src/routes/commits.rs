//! Commit detail endpoint.
//!
//! GET /api/v1/commits/{id}
//!
//! Author, date, full message and diffstat of one commit, as classified
//! lines. `id` is a full or abbreviated hex object id.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::Result;
use crate::models::DiffLine;
use crate::session::SharedWorkspace;

pub fn routes(workspace: SharedWorkspace) -> Router {
    Router::new()
        .route("/api/v1/commits/{id}", get(show_commit))
        .with_state(workspace)
}

async fn show_commit(
    State(workspace): State<SharedWorkspace>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DiffLine>>> {
    let session = workspace.current().await?;
    Ok(Json(session.show_commit(&id).await?))
}
