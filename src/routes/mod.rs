//! API route handlers - maps HTTP endpoints onto the active session.
//!
//! Each submodule defines routes for a feature area:
//! - `repository`: repo info plus open/init/clone (switches the session)
//! - `status`: current snapshot and manual refresh
//! - `operations`: the mutating operations
//! - `diff`: working-tree diff for one file
//! - `commits`: commit header, message and diffstat
//! - `blame`: per-line attribution

pub mod blame;
pub mod commits;
pub mod diff;
pub mod operations;
pub mod repository;
pub mod status;

use axum::Router;

use crate::session::SharedWorkspace;

pub fn create_router(workspace: SharedWorkspace) -> Router {
    Router::new()
        .merge(repository::routes(workspace.clone()))
        .merge(status::routes(workspace.clone()))
        .merge(operations::routes(workspace.clone()))
        .merge(diff::routes(workspace.clone()))
        .merge(commits::routes(workspace.clone()))
        .merge(blame::routes(workspace))
}
