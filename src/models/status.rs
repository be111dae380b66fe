//! Point-in-time repository status.
//!
//! A `StatusSnapshot` is rebuilt wholesale on every refresh and published as
//! an immutable value. Optional metadata is wrapped in `Degradable` so a
//! failed sub-computation shows up as data rather than as a swallowed error.

use serde::{Deserialize, Serialize};

use super::CommitInfo;

/// Either a computed value or a marker that computing it failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Degradable<T> {
    Present { value: T },
    Degraded { reason: String },
}

impl<T> Degradable<T> {
    pub fn present(value: T) -> Self {
        Degradable::Present { value }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Degradable::Degraded {
            reason: reason.into(),
        }
    }

    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::present(value),
            Err(e) => Self::degraded(e.to_string()),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Degradable::Present { value } => Some(value),
            Degradable::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Degradable::Degraded { .. })
    }
}

impl<T> Degradable<Vec<T>> {
    /// Items when present, an empty slice when degraded.
    pub fn items(&self) -> &[T] {
        self.value().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeKind {
    Untracked,
    Modified,
    Deleted,
    Renamed,
    Conflicted,
    Unmodified,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub kind: FileChangeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub is_head: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteInfo {
    pub name: String,
    pub url: String,
}

/// Ahead/behind against the current branch's upstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Divergence {
    Tracked { ahead: usize, behind: usize },
    /// No upstream configured (or HEAD is not on a branch).
    LocalOnly,
    /// Computing divergence failed; displayed as empty.
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub head: Option<String>,
    pub changed_files: Degradable<Vec<FileChange>>,
    pub history: Degradable<Vec<CommitInfo>>,
    pub branches: Degradable<Vec<BranchInfo>>,
    pub stashes: Degradable<Vec<String>>,
    pub tags: Degradable<Vec<String>>,
    pub remotes: Degradable<Vec<RemoteInfo>>,
    pub divergence: Divergence,
}

impl StatusSnapshot {
    /// Snapshot with every field degraded, used before the first build
    /// completes.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            head: None,
            changed_files: Degradable::degraded(reason),
            history: Degradable::degraded(reason),
            branches: Degradable::degraded(reason),
            stashes: Degradable::degraded(reason),
            tags: Degradable::degraded(reason),
            remotes: Degradable::degraded(reason),
            divergence: Divergence::Unknown,
        }
    }

    /// Names of the fields that failed to compute.
    pub fn degraded_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.changed_files.is_degraded() {
            fields.push("changed_files");
        }
        if self.history.is_degraded() {
            fields.push("history");
        }
        if self.branches.is_degraded() {
            fields.push("branches");
        }
        if self.stashes.is_degraded() {
            fields.push("stashes");
        }
        if self.tags.is_degraded() {
            fields.push("tags");
        }
        if self.remotes.is_degraded() {
            fields.push("remotes");
        }
        if self.divergence == Divergence::Unknown {
            fields.push("divergence");
        }
        fields
    }

    /// Changed files whose path contains `query`, ignoring case.
    pub fn filter_changes(&self, query: &str) -> Vec<FileChange> {
        let query = query.trim().to_lowercase();
        self.changed_files
            .items()
            .iter()
            .filter(|change| query.is_empty() || change.path.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub fn current_branch(&self) -> Option<&BranchInfo> {
        self.branches.items().iter().find(|b| b.is_head)
    }
}
