use git2::{ErrorCode, Oid, Repository, Sort};

use crate::error::{AppError, Result};
use crate::git::repository::commit_to_info;
use crate::models::CommitInfo;

/// Commits reachable from HEAD, newest first, at most `limit` of them.
///
/// An unborn HEAD has no history yet and yields an empty list.
pub fn recent_commits(repo: &Repository, limit: usize) -> Result<Vec<CommitInfo>> {
    if let Err(e) = repo.head() {
        if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound {
            return Ok(Vec::new());
        }
        return Err(e.into());
    }

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    revwalk.push_head()?;

    let mut commits = Vec::with_capacity(limit.min(256));
    for oid in revwalk.take(limit) {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        commits.push(commit_to_info(&commit));
    }

    Ok(commits)
}

/// Parse a full or abbreviated hex commit id.
///
/// Rejects anything that is not plain hex so the id can be handed to the
/// command-line tool without being read as an option.
pub fn parse_commit_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.len() < 4 || id.len() > 40 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::Validation(format!("not a commit id: {:?}", id)));
    }
    Ok(id)
}

/// Look up a commit by full or abbreviated id.
pub fn find_commit<'r>(repo: &'r Repository, id: &str) -> Result<git2::Commit<'r>> {
    let id = parse_commit_id(id)?;
    let commit = match Oid::from_str(id) {
        Ok(oid) if id.len() == 40 => repo.find_commit(oid)?,
        _ => repo.revparse_single(id)?.peel_to_commit()?,
    };
    Ok(commit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_ids_must_be_hex() {
        assert!(parse_commit_id("abc123").is_ok());
        assert!(parse_commit_id("--output=/tmp/x").is_err());
        assert!(parse_commit_id("abc").is_err());
        assert!(parse_commit_id("HEAD").is_err());
    }

    #[test]
    fn unborn_head_has_empty_history() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(recent_commits(&repo, 200).unwrap().is_empty());
    }
}
