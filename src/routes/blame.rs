//! Blame endpoint.
//!
//! GET /api/v1/blame?path=<path>
//!
//! The tool's blame output for a working-tree file, one classified line per
//! source line.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::Result;
use crate::models::DiffLine;
use crate::session::SharedWorkspace;

pub fn routes(workspace: SharedWorkspace) -> Router {
    Router::new()
        .route("/api/v1/blame", get(get_blame))
        .with_state(workspace)
}

#[derive(Debug, Deserialize)]
struct BlameQuery {
    path: String,
}

async fn get_blame(
    State(workspace): State<SharedWorkspace>,
    Query(query): Query<BlameQuery>,
) -> Result<Json<Vec<DiffLine>>> {
    let session = workspace.current().await?;
    let lines = session.blame(&query.path).await?;
    Ok(Json(lines))
}
