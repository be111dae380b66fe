//! Status snapshot builder.
//!
//! Computes one point-in-time view of the repository: changed files,
//! history, branches, stashes, tags, remotes and upstream divergence.
//!
//! Each field is computed independently. A failing field degrades to a
//! `Degradable::Degraded` marker (or `Divergence::Unknown`) and the rest of
//! the snapshot is still built. Nothing here mutates the repository.

use std::collections::HashSet;
use std::time::Instant;

use git2::{Branch, BranchType, Delta, ErrorCode, Repository, Status, StatusOptions};

use crate::error::Result;
use crate::git::cli::{Bound, GitCli};
use crate::git::history::recent_commits;
use crate::git::repository::GitRepository;
use crate::models::{
    BranchInfo, Degradable, Divergence, FileChange, FileChangeKind, RemoteInfo, StatusSnapshot,
};

/// Status flag predicates in priority order; the first match wins.
const CLASSIFIERS: [(FileChangeKind, fn(Status) -> bool); 5] = [
    (FileChangeKind::Untracked, is_new),
    (FileChangeKind::Modified, is_modified),
    (FileChangeKind::Deleted, is_deleted),
    (FileChangeKind::Renamed, is_renamed),
    (FileChangeKind::Conflicted, is_conflicted),
];

fn is_new(s: Status) -> bool {
    s.intersects(Status::WT_NEW | Status::INDEX_NEW)
}

fn is_modified(s: Status) -> bool {
    s.intersects(
        Status::WT_MODIFIED | Status::INDEX_MODIFIED | Status::WT_TYPECHANGE | Status::INDEX_TYPECHANGE,
    )
}

fn is_deleted(s: Status) -> bool {
    s.intersects(Status::WT_DELETED | Status::INDEX_DELETED)
}

fn is_renamed(s: Status) -> bool {
    s.intersects(Status::WT_RENAMED | Status::INDEX_RENAMED)
}

fn is_conflicted(s: Status) -> bool {
    s.contains(Status::CONFLICTED)
}

/// Map native status flags to a single kind.
///
/// Total and order-independent: the result depends only on which flags are
/// set. Ignored entries are `None`; anything with no matching flag is
/// `Unmodified`.
pub fn classify(status: Status) -> Option<FileChangeKind> {
    if status.contains(Status::IGNORED) {
        return None;
    }
    let kind = CLASSIFIERS
        .iter()
        .find(|(_, matches)| matches(status))
        .map(|(kind, _)| *kind)
        .unwrap_or(FileChangeKind::Unmodified);
    Some(kind)
}

/// Build a snapshot. Never fails as a whole.
pub fn build_snapshot(backend: &GitRepository, cli: &GitCli, history_limit: usize) -> StatusSnapshot {
    let started = Instant::now();
    let repo = &backend.repo;

    let snapshot = StatusSnapshot {
        head: backend.head_branch(),
        changed_files: Degradable::from_result(changed_files(repo)),
        history: Degradable::from_result(recent_commits(repo, history_limit)),
        branches: Degradable::from_result(local_branches(repo)),
        stashes: Degradable::from_result(stash_list(cli)),
        tags: Degradable::from_result(tag_names(repo)),
        remotes: Degradable::from_result(remotes(repo)),
        divergence: divergence(repo),
    };

    let degraded = snapshot.degraded_fields();
    if degraded.is_empty() {
        tracing::debug!("Snapshot built in {:?}", started.elapsed());
    } else {
        tracing::warn!(
            "Snapshot built in {:?} with degraded fields: {}",
            started.elapsed(),
            degraded.join(", ")
        );
    }

    snapshot
}

pub fn changed_files(repo: &Repository) -> Result<Vec<FileChange>> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .include_unmodified(false)
        .renames_head_to_index(true);

    let statuses = repo.statuses(Some(&mut opts))?;

    let mut seen = HashSet::new();
    let mut changes = Vec::new();
    for entry in statuses.iter() {
        let Some(path) = entry_path(&entry) else {
            continue;
        };
        let Some(kind) = classify(entry.status()) else {
            continue;
        };
        if kind == FileChangeKind::Unmodified {
            continue;
        }
        if seen.insert(path.clone()) {
            changes.push(FileChange { path, kind });
        }
    }

    Ok(changes)
}

/// Staged renames are listed under their new path.
fn entry_path(entry: &git2::StatusEntry) -> Option<String> {
    let renamed_to = entry
        .head_to_index()
        .filter(|delta| delta.status() == Delta::Renamed)
        .and_then(|delta| delta.new_file().path().map(|p| p.to_string_lossy().to_string()));
    renamed_to.or_else(|| entry.path().map(str::to_string))
}

pub fn local_branches(repo: &Repository) -> Result<Vec<BranchInfo>> {
    let mut branches = Vec::new();
    for branch in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = branch?;
        let Some(name) = branch.name()? else {
            continue;
        };
        branches.push(BranchInfo {
            name: name.to_string(),
            is_head: branch.is_head(),
        });
    }
    branches.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(branches)
}

/// Stash entries as the tool reports them, top of the stack first.
pub fn stash_list(cli: &GitCli) -> Result<Vec<String>> {
    let output = cli.run("stash list", &["stash", "list"], Bound::Local)?;
    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn tag_names(repo: &Repository) -> Result<Vec<String>> {
    let names = repo.tag_names(None)?;
    let mut tags: Vec<String> = names.iter().flatten().map(str::to_string).collect();
    tags.sort();
    Ok(tags)
}

pub fn remotes(repo: &Repository) -> Result<Vec<RemoteInfo>> {
    let mut remotes = Vec::new();
    for name in repo.remotes()?.iter().flatten() {
        let remote = repo.find_remote(name)?;
        remotes.push(RemoteInfo {
            name: name.to_string(),
            url: remote.url().unwrap_or("").to_string(),
        });
    }
    Ok(remotes)
}

/// Ahead/behind of the current branch against its upstream.
pub fn divergence(repo: &Repository) -> Divergence {
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if e.code() == ErrorCode::UnbornBranch => return Divergence::LocalOnly,
        Err(_) => return Divergence::Unknown,
    };
    if !head.is_branch() {
        return Divergence::LocalOnly;
    }

    let branch = Branch::wrap(head);
    let upstream = match branch.upstream() {
        Ok(upstream) => upstream,
        Err(e) if e.code() == ErrorCode::NotFound => return Divergence::LocalOnly,
        Err(_) => return Divergence::Unknown,
    };

    let (Some(local), Some(remote)) = (branch.get().target(), upstream.get().target()) else {
        return Divergence::Unknown;
    };

    match repo.graph_ahead_behind(local, remote) {
        Ok((ahead, behind)) => Divergence::Tracked { ahead, behind },
        Err(e) => {
            tracing::debug!("Divergence unavailable: {}", e);
            Divergence::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_flag_wins() {
        assert_eq!(
            classify(Status::WT_NEW | Status::INDEX_MODIFIED),
            Some(FileChangeKind::Untracked)
        );
        assert_eq!(
            classify(Status::INDEX_MODIFIED | Status::WT_MODIFIED),
            Some(FileChangeKind::Modified)
        );
        assert_eq!(
            classify(Status::WT_DELETED | Status::INDEX_RENAMED),
            Some(FileChangeKind::Deleted)
        );
        assert_eq!(classify(Status::INDEX_RENAMED), Some(FileChangeKind::Renamed));
        assert_eq!(classify(Status::CONFLICTED), Some(FileChangeKind::Conflicted));
    }

    #[test]
    fn classification_ignores_flag_order() {
        let a = Status::WT_RENAMED | Status::CONFLICTED | Status::INDEX_DELETED;
        let b = Status::INDEX_DELETED | Status::WT_RENAMED | Status::CONFLICTED;
        assert_eq!(classify(a), classify(b));
        assert_eq!(classify(a), Some(FileChangeKind::Deleted));
    }

    #[test]
    fn ignored_and_clean_entries() {
        assert_eq!(classify(Status::IGNORED), None);
        assert_eq!(classify(Status::CURRENT), Some(FileChangeKind::Unmodified));
    }

    #[test]
    fn every_single_flag_is_classified() {
        let flags = [
            Status::INDEX_NEW,
            Status::INDEX_MODIFIED,
            Status::INDEX_DELETED,
            Status::INDEX_RENAMED,
            Status::INDEX_TYPECHANGE,
            Status::WT_NEW,
            Status::WT_MODIFIED,
            Status::WT_DELETED,
            Status::WT_TYPECHANGE,
            Status::WT_RENAMED,
            Status::CONFLICTED,
        ];
        for flag in flags {
            let kind = classify(flag);
            assert!(kind.is_some());
            assert_ne!(kind, Some(FileChangeKind::Unmodified), "{flag:?}");
        }
    }
}
