use git2::{ErrorCode, Repository, RepositoryInitOptions};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{CommitInfo, RepositoryInfo};

/// The open backend handle for one working-tree repository.
pub struct GitRepository {
    pub repo: Repository,
    pub root: PathBuf,
}

impl GitRepository {
    /// Open the repository containing `path`, searching parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let not_found = || AppError::NotARepository(path.as_ref().to_string_lossy().to_string());
        let root = Self::discover(&path).ok_or_else(not_found)?;
        let repo = Repository::open(&root).map_err(|_| not_found())?;
        let root = std::fs::canonicalize(&root).unwrap_or(root);

        Ok(Self { repo, root })
    }

    /// Create an empty repository at `path` and open it.
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Self> {
        std::fs::create_dir_all(&path).map_err(|e| AppError::InvalidPath(format!("{}: {}", path.as_ref().display(), e)))?;

        let mut opts = RepositoryInitOptions::new();
        opts.mkpath(true);
        Repository::init_opts(&path, &opts)?;

        Self::open(path)
    }

    /// Working-tree root of the repository containing `path`. `None` outside
    /// a repository and for bare repositories.
    pub fn discover<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
        Repository::discover(path)
            .ok()
            .and_then(|repo| repo.workdir().map(|p| p.to_path_buf()))
    }

    pub fn info(&self) -> RepositoryInfo {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        RepositoryInfo {
            name,
            path: self.root.to_string_lossy().to_string(),
            head_branch: self.head_branch(),
        }
    }

    /// Short name of the checked-out branch; `None` when detached.
    ///
    /// An unborn branch still has a name, read from the symbolic HEAD.
    pub fn head_branch(&self) -> Option<String> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(|s| s.to_string()),
            Ok(_) => None,
            Err(e) if e.code() == ErrorCode::UnbornBranch => self
                .repo
                .find_reference("HEAD")
                .ok()
                .and_then(|r| r.symbolic_target().map(|t| t.to_string()))
                .map(|t| t.trim_start_matches("refs/heads/").to_string()),
            Err(_) => None,
        }
    }

    pub fn is_head_branch(&self, name: &str) -> bool {
        self.head_branch().as_deref() == Some(name)
    }
}

/// Check that `path` is relative and stays inside the repository root.
pub fn validate_relative_path(path: &str) -> Result<&str> {
    let trimmed = path.trim();
    let p = Path::new(trimmed);
    let escapes = p
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir));
    if trimmed.is_empty() || trimmed.starts_with('-') || escapes {
        return Err(AppError::InvalidPath(path.to_string()));
    }
    Ok(trimmed)
}

pub fn commit_to_info(commit: &git2::Commit) -> CommitInfo {
    let author = commit.author();
    let when = author.when();
    let timestamp = when.seconds();

    let utc = chrono::DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
    let authored_at = match chrono::FixedOffset::east_opt(when.offset_minutes() * 60) {
        Some(offset) => utc.with_timezone(&offset),
        None => utc.fixed_offset(),
    };

    CommitInfo {
        id: commit.id().to_string(),
        summary: commit.summary().unwrap_or("").trim().to_string(),
        author_name: author.name().unwrap_or("Unknown").to_string(),
        author_email: author.email().unwrap_or("").to_string(),
        authored_at,
        relative_time: format_relative_time(timestamp),
    }
}

pub fn format_relative_time(timestamp: i64) -> String {
    format_relative_time_from(chrono::Utc::now().timestamp(), timestamp)
}

/// Largest unit first; the first unit that fits at least once is used.
const AGE_UNITS: [(i64, &str); 5] = [
    (365 * 86_400, "y"),
    (30 * 86_400, "mo"),
    (86_400, "d"),
    (3_600, "h"),
    (60, "m"),
];

fn format_relative_time_from(now: i64, timestamp: i64) -> String {
    let age = (now - timestamp).max(0);
    AGE_UNITS
        .iter()
        .find(|(seconds, _)| age >= *seconds)
        .map(|(seconds, unit)| format!("{}{} ago", age / seconds, unit))
        .unwrap_or_else(|| "just now".to_string())
}
