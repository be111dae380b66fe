//! Repository-level DTOs.
//!
//! - `RepositoryInfo`: name, root path and current branch (header display)
//! - `OpenRepoRequest` / `InitRepoRequest` / `CloneRepoRequest`: request
//!   bodies for switching the active session

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub path: String,
    pub head_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenRepoRequest {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitRepoRequest {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloneRepoRequest {
    pub url: String,
    pub path: String,
}
