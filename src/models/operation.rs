//! Mutating operations accepted by the session.
//!
//! `Operation` is a closed set; the JSON form is tagged by `op`, e.g.
//! `{"op": "commit", "summary": "fix bug", "body": "", "amend": false}`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::StatusSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", content = "path", rename_all = "snake_case")]
pub enum StageTarget {
    Path(String),
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Stage {
        target: StageTarget,
    },
    DiscardChanges {
        path: String,
    },
    Commit {
        summary: String,
        #[serde(default)]
        body: String,
        #[serde(default)]
        amend: bool,
    },
    Checkout {
        branch: String,
    },
    CreateBranch {
        name: String,
    },
    RenameBranch {
        old: String,
        new: String,
    },
    DeleteBranch {
        name: String,
    },
    Merge {
        branch: String,
        #[serde(default)]
        squash: bool,
    },
    CherryPick {
        commit: String,
    },
    Revert {
        commit: String,
    },
    TagCreate {
        name: String,
    },
    StashPush,
    StashPop,
    RemoteAdd {
        name: String,
        url: String,
    },
    Fetch,
    Pull,
    Push,
}

impl Operation {
    /// Short label used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Stage { .. } => "stage",
            Operation::DiscardChanges { .. } => "discard changes",
            Operation::Commit { .. } => "commit",
            Operation::Checkout { .. } => "checkout",
            Operation::CreateBranch { .. } => "create branch",
            Operation::RenameBranch { .. } => "rename branch",
            Operation::DeleteBranch { .. } => "delete branch",
            Operation::Merge { .. } => "merge",
            Operation::CherryPick { .. } => "cherry-pick",
            Operation::Revert { .. } => "revert",
            Operation::TagCreate { .. } => "create tag",
            Operation::StashPush => "stash push",
            Operation::StashPop => "stash pop",
            Operation::RemoteAdd { .. } => "add remote",
            Operation::Fetch => "fetch",
            Operation::Pull => "pull",
            Operation::Push => "push",
        }
    }

    /// Whether the operation talks to a remote.
    pub fn is_network(&self) -> bool {
        matches!(self, Operation::Fetch | Operation::Pull | Operation::Push)
    }
}

/// Result of a successful operation: a status line plus the snapshot
/// rebuilt right after it.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    pub operation: String,
    pub message: String,
    pub snapshot: Arc<StatusSnapshot>,
}
