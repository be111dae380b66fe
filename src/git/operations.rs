//! Mutating operations against the backend.
//!
//! Three stages, in order:
//! - `validate`: input checks that need no repository (empty summary, bad
//!   names, paths escaping the root)
//! - `precheck`: structural checks against the current HEAD (deleting or
//!   switching to the checked-out branch, merging a branch into itself)
//! - `apply`: the mutation itself
//!
//! Failures from `apply` are scoped to the operation with
//! `AppError::at_operation` so no raw backend error leaves this module.
//! Serialization and the post-operation refresh live in `session`.

use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{
    BranchType, ErrorCode, IndexAddOption, ObjectType, Oid, Reference, Remote, Repository, RepositoryState,
    Signature,
};

use crate::error::{AppError, Result};
use crate::git::cli::{Bound, GitCli};
use crate::git::history::{find_commit, parse_commit_id};
use crate::git::repository::{validate_relative_path, GitRepository};
use crate::models::{Operation, StageTarget};

const STASH_MESSAGE: &str = "git-desk stash";

pub fn validate(op: &Operation) -> Result<()> {
    match op {
        Operation::Stage {
            target: StageTarget::Path(path),
        }
        | Operation::DiscardChanges { path } => {
            validate_relative_path(path)?;
        }
        Operation::Stage {
            target: StageTarget::All,
        } => {}
        Operation::Commit { summary, .. } => {
            if summary.trim().is_empty() {
                return Err(AppError::Validation("Commit summary is required".to_string()));
            }
        }
        Operation::Checkout { branch: name }
        | Operation::CreateBranch { name }
        | Operation::DeleteBranch { name }
        | Operation::Merge { branch: name, .. } => validate_branch_name(name)?,
        Operation::RenameBranch { old, new } => {
            validate_branch_name(old)?;
            validate_branch_name(new)?;
        }
        Operation::CherryPick { commit } | Operation::Revert { commit } => {
            parse_commit_id(commit)?;
        }
        Operation::TagCreate { name } => {
            if name.starts_with('-') || !Reference::is_valid_name(&format!("refs/tags/{}", name)) {
                return Err(AppError::Validation(format!("Invalid tag name: {:?}", name)));
            }
        }
        Operation::RemoteAdd { name, url } => {
            if !Remote::is_valid_name(name) {
                return Err(AppError::Validation(format!("Invalid remote name: {:?}", name)));
            }
            if url.trim().is_empty() {
                return Err(AppError::Validation("Remote URL is required".to_string()));
            }
        }
        Operation::StashPush
        | Operation::StashPop
        | Operation::Fetch
        | Operation::Pull
        | Operation::Push => {}
    }
    Ok(())
}

fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('-') || !Reference::is_valid_name(&format!("refs/heads/{}", name)) {
        return Err(AppError::Validation(format!("Invalid branch name: {:?}", name)));
    }
    Ok(())
}

pub fn precheck(backend: &GitRepository, op: &Operation) -> Result<()> {
    match op {
        Operation::Checkout { branch } if backend.is_head_branch(branch) => {
            Err(AppError::InvalidOperation(format!("Already on '{}'", branch)))
        }
        Operation::DeleteBranch { name } if backend.is_head_branch(name) => {
            Err(AppError::InvalidOperation("Cannot delete the current branch".to_string()))
        }
        Operation::Merge { branch, .. } if backend.is_head_branch(branch) => {
            Err(AppError::InvalidOperation(format!("Cannot merge '{}' into itself", branch)))
        }
        Operation::Commit { amend: true, .. } if backend.repo.state() == RepositoryState::Merge => Err(
            AppError::InvalidOperation("Cannot amend while a merge is in progress".to_string()),
        ),
        _ => Ok(()),
    }
}

/// Run the mutation. Returns a short status line on success.
pub fn apply(backend: &GitRepository, cli: &GitCli, op: &Operation) -> Result<String> {
    let repo = &backend.repo;
    let name = op.name();

    let result = match op {
        Operation::Stage { target } => stage(backend, target),
        Operation::DiscardChanges { path } => cli
            .run(name, &["checkout", "--", path], Bound::Local)
            .map(|_| format!("Discarded: {}", path)),
        Operation::Commit { summary, body, amend } => commit(repo, summary, body, *amend),
        Operation::Checkout { branch } => checkout(repo, branch).map(|_| format!("Switched to {}", branch)),
        Operation::CreateBranch { name } => create_branch(repo, name),
        Operation::RenameBranch { old, new } => cli
            .run(name, &["branch", "-m", old, new], Bound::Local)
            .map(|_| format!("Renamed {} to {}", old, new)),
        Operation::DeleteBranch { name } => repo
            .find_branch(name, BranchType::Local)
            .and_then(|mut branch| branch.delete())
            .map(|_| format!("Deleted branch: {}", name))
            .map_err(AppError::from),
        Operation::Merge { branch, squash: true } => cli
            .run(name, &["merge", "--squash", branch], Bound::Local)
            .map(|_| format!("Squashed {} into the index; commit to finish", branch)),
        Operation::Merge { branch, squash: false } => merge(backend, branch),
        Operation::CherryPick { commit } => cherry_pick(repo, commit),
        Operation::Revert { commit } => revert(repo, commit),
        Operation::TagCreate { name } => tag_create(repo, name),
        Operation::StashPush => cli
            .run(name, &["stash", "push", "-m", STASH_MESSAGE], Bound::Local)
            .map(|out| first_line_or(&out.stdout, "Changes stashed.")),
        Operation::StashPop => cli
            .run(name, &["stash", "pop"], Bound::Local)
            .map(|_| "Stash popped.".to_string()),
        Operation::RemoteAdd { name, url } => repo
            .remote(name, url)
            .map(|_| format!("Remote added: {}", name))
            .map_err(AppError::from),
        Operation::Fetch => cli
            .run(name, &["fetch", "--all"], Bound::Network)
            .map(|_| "Fetch complete.".to_string()),
        Operation::Pull => cli.run(name, &["pull"], Bound::Network).map(|out| {
            if out.stdout.contains("Already up to date") {
                "Already up to date.".to_string()
            } else {
                "Pull complete.".to_string()
            }
        }),
        Operation::Push => cli
            .run(name, &["push"], Bound::Network)
            .map(|_| "Push complete.".to_string()),
    };

    result.map_err(|e| e.at_operation(name))
}

fn first_line_or(text: &str, fallback: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn stage(backend: &GitRepository, target: &StageTarget) -> Result<String> {
    let repo = &backend.repo;
    match target {
        StageTarget::All => {
            stage_all(repo)?;
            Ok("Staged all changes".to_string())
        }
        StageTarget::Path(path) => {
            let mut index = repo.index()?;
            if backend.root.join(path).exists() {
                index.add_path(Path::new(path))?;
            } else {
                index.remove_path(Path::new(path))?;
            }
            index.write()?;
            Ok(format!("Staged: {}", path))
        }
    }
}

/// Stage new, modified and deleted files alike.
fn stage_all(repo: &Repository) -> Result<()> {
    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"], None)?;
    index.write()?;
    Ok(())
}

/// Summary, then the body (if any) after a blank line.
pub fn compose_message(summary: &str, body: &str) -> String {
    let summary = summary.trim();
    let body = body.trim();
    if body.is_empty() {
        summary.to_string()
    } else {
        format!("{}\n\n{}", summary, body)
    }
}

fn head_commit(repo: &Repository) -> Result<Option<git2::Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn commit(repo: &Repository, summary: &str, body: &str, amend: bool) -> Result<String> {
    stage_all(repo)?;

    let message = compose_message(summary, body);
    let sig = repo.signature()?;
    let tree = repo.find_tree(repo.index()?.write_tree()?)?;

    if amend {
        let previous = head_commit(repo)?
            .ok_or_else(|| AppError::Internal("There is no commit to amend".to_string()))?;
        previous.amend(Some("HEAD"), Some(&sig), Some(&sig), None, Some(&message), Some(&tree))?;
    } else {
        let mut parents: Vec<git2::Commit> = head_commit(repo)?.into_iter().collect();
        for id in merge_heads(repo)? {
            parents.push(repo.find_commit(id)?);
        }
        let parents: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)?;
    }
    // Concludes a merge, cherry-pick or revert that stopped on conflicts.
    repo.cleanup_state()?;

    Ok(format!("Committed: {}", summary.trim()))
}

/// Commits recorded in MERGE_HEAD while a conflicted merge is pending.
fn merge_heads(repo: &Repository) -> Result<Vec<Oid>> {
    let mut heads = Vec::new();
    if repo.state() == RepositoryState::Merge {
        // `mergehead_foreach` needs `&mut Repository`; use a second handle on the same repo.
        let mut repo = Repository::open(repo.path())?;
        repo.mergehead_foreach(|id| {
            heads.push(*id);
            true
        })?;
    }
    Ok(heads)
}

fn checkout(repo: &Repository, name: &str) -> Result<()> {
    let branch = repo.find_branch(name, BranchType::Local)?;
    let refname = branch
        .get()
        .name()
        .ok_or_else(|| AppError::Internal(format!("Branch {} has a non UTF-8 name", name)))?
        .to_string();
    let target = branch.get().peel_to_commit()?;

    let mut opts = CheckoutBuilder::new();
    opts.safe();
    repo.checkout_tree(target.as_object(), Some(&mut opts))?;
    repo.set_head(&refname)?;
    Ok(())
}

fn create_branch(repo: &Repository, name: &str) -> Result<String> {
    let head = head_commit(repo)?
        .ok_or_else(|| AppError::Internal("Cannot create a branch before the first commit".to_string()))?;
    repo.branch(name, &head, false)?;
    repo.set_head(&format!("refs/heads/{}", name))?;
    Ok(format!("Created and switched to {}", name))
}

fn conflict_error(operation: &str, repo: &Repository) -> Result<AppError> {
    let count = repo.index()?.conflicts()?.count();
    Ok(AppError::OperationFailed {
        operation: operation.to_string(),
        message: format!(
            "{} conflicted file{}; resolve and commit to finish",
            count,
            if count == 1 { "" } else { "s" }
        ),
    })
}

fn merge(backend: &GitRepository, name: &str) -> Result<String> {
    let repo = &backend.repo;
    let branch = repo.find_branch(name, BranchType::Local)?;
    let incoming = repo.reference_to_annotated_commit(branch.get())?;
    let (analysis, _) = repo.merge_analysis(&[&incoming])?;

    if analysis.is_up_to_date() {
        return Ok("Already up to date.".to_string());
    }

    let head_name = backend.head_branch().unwrap_or_else(|| "HEAD".to_string());

    if analysis.is_fast_forward() && !analysis.is_unborn() {
        let target = repo.find_commit(incoming.id())?;
        let mut opts = CheckoutBuilder::new();
        opts.safe();
        repo.checkout_tree(target.as_object(), Some(&mut opts))?;
        repo.head()?
            .set_target(incoming.id(), &format!("merge {}: Fast-forward", name))?;
        return Ok(format!("Fast-forwarded {} to {}", head_name, name));
    }

    repo.merge(&[&incoming], None, None)?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        return Err(conflict_error("merge", repo)?);
    }

    let tree = repo.find_tree(index.write_tree()?)?;
    let sig = repo.signature()?;
    let ours = repo.head()?.peel_to_commit()?;
    let theirs = repo.find_commit(incoming.id())?;
    repo.commit(
        Some("HEAD"),
        &sig,
        &sig,
        &format!("Merge branch '{}'", name),
        &tree,
        &[&ours, &theirs],
    )?;
    repo.cleanup_state()?;

    Ok(format!("Merged {} into {}", name, head_name))
}

fn committer_or(repo: &Repository, fallback: &Signature) -> Signature<'static> {
    repo.signature().unwrap_or_else(|_| fallback.to_owned())
}

fn cherry_pick(repo: &Repository, id: &str) -> Result<String> {
    let picked = find_commit(repo, id)?;
    repo.cherrypick(&picked, None)?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        return Err(conflict_error("cherry-pick", repo)?);
    }

    let tree = repo.find_tree(index.write_tree()?)?;
    let head = repo.head()?.peel_to_commit()?;
    let author = picked.author();
    let committer = committer_or(repo, &author);
    repo.commit(
        Some("HEAD"),
        &author,
        &committer,
        picked.message().unwrap_or(""),
        &tree,
        &[&head],
    )?;
    repo.cleanup_state()?;

    Ok(format!("Cherry-picked: {}", picked.summary().unwrap_or("")))
}

fn revert(repo: &Repository, id: &str) -> Result<String> {
    let reverted = find_commit(repo, id)?;
    repo.revert(&reverted, None)?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        return Err(conflict_error("revert", repo)?);
    }

    let tree = repo.find_tree(index.write_tree()?)?;
    let head = repo.head()?.peel_to_commit()?;
    let sig = committer_or(repo, &reverted.author());
    let summary = reverted.summary().unwrap_or("");
    let message = format!("Revert \"{}\"\n\nThis reverts commit {}.", summary, reverted.id());
    repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&head])?;
    repo.cleanup_state()?;

    Ok(format!("Reverted: {}", summary))
}

fn tag_create(repo: &Repository, name: &str) -> Result<String> {
    let target = repo.head()?.peel(ObjectType::Commit)?;
    repo.tag_lightweight(name, &target, false)?;
    Ok(format!("Tag created: {}", name))
}
