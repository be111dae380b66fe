//! Operation endpoint.
//!
//! POST /api/v1/operations
//!
//! Body is one operation tagged by `op`, e.g.
//! `{"op": "checkout", "branch": "feature"}`. Returns the status line and
//! the snapshot rebuilt after the operation. A second request while one is
//! running gets 409 `busy`.

use axum::{extract::State, routing::post, Json, Router};

use crate::error::Result;
use crate::models::{Operation, OperationOutcome};
use crate::session::SharedWorkspace;

pub fn routes(workspace: SharedWorkspace) -> Router {
    Router::new()
        .route("/api/v1/operations", post(run_operation))
        .with_state(workspace)
}

async fn run_operation(
    State(workspace): State<SharedWorkspace>,
    Json(op): Json<Operation>,
) -> Result<Json<OperationOutcome>> {
    let session = workspace.current().await?;
    let outcome = session.execute(op).await?;
    Ok(Json(outcome))
}
