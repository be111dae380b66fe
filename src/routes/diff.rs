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
        .route("/api/v1/diff", get(get_diff))
        .with_state(workspace)
}

#[derive(Debug, Deserialize)]
struct DiffQuery {
    path: String,
}

async fn get_diff(
    State(workspace): State<SharedWorkspace>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<Vec<DiffLine>>> {
    let session = workspace.current().await?;
    let lines = session.diff_file(&query.path).await?;
    Ok(Json(lines))
}
