//! Snapshot endpoints.
//!
//! - GET /api/v1/status?filter=
//!   The current snapshot. With `filter`, `changed_files` only keeps paths
//!   containing it (case-insensitive).
//!
//! - POST /api/v1/status/refresh
//!   Rebuild now. The only way to refresh when the working tree could not be
//!   watched.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::error::Result;
use crate::models::{Degradable, StatusSnapshot};
use crate::session::SharedWorkspace;

pub fn routes(workspace: SharedWorkspace) -> Router {
    Router::new()
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/status/refresh", post(refresh_status))
        .with_state(workspace)
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    filter: Option<String>,
}

async fn get_status(
    State(workspace): State<SharedWorkspace>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusSnapshot>> {
    let session = workspace.current().await?;
    let mut snapshot = StatusSnapshot::clone(&session.snapshot());

    if let Some(filter) = query.filter.as_deref().filter(|f| !f.trim().is_empty()) {
        if !snapshot.changed_files.is_degraded() {
            snapshot.changed_files = Degradable::present(snapshot.filter_changes(filter));
        }
    }

    Ok(Json(snapshot))
}

async fn refresh_status(State(workspace): State<SharedWorkspace>) -> Result<Json<StatusSnapshot>> {
    let session = workspace.current().await?;
    let snapshot = session.refresh().await?;
    Ok(Json(StatusSnapshot::clone(&snapshot)))
}
