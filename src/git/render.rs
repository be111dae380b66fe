//! Diff, blame and show rendering.
//!
//! `render` turns raw tool output into classified lines. It is total: any
//! input, including empty or binary-looking text, produces a line sequence.
//! The inspection helpers below fetch that raw text for a file or commit.

use std::path::Path;

use crate::error::Result;
use crate::git::cli::{Bound, GitCli};
use crate::git::history::parse_commit_id;
use crate::git::repository::validate_relative_path;
use crate::models::{DiffLine, LineClass};

const SHOW_FORMAT: &str = "--format=Author: %an <%ae>%nDate: %ai%n%n%B";

/// Classify one line of diff/blame/show output.
pub fn classify_line(line: &str) -> LineClass {
    if line.starts_with("@@") {
        LineClass::HunkHeader
    } else if line.starts_with('+') && !line.starts_with("+++") {
        LineClass::Addition
    } else if line.starts_with('-') && !line.starts_with("---") {
        LineClass::Deletion
    } else if line.starts_with("Author:") || line.contains("insertion") || line.contains("deletion") {
        LineClass::Metadata
    } else {
        LineClass::Context
    }
}

pub fn render(raw: &str) -> Vec<DiffLine> {
    raw.lines()
        .map(|line| DiffLine {
            raw_text: line.to_string(),
            class: classify_line(line),
        })
        .collect()
}

/// Content of a file with nothing to diff against: every line is an addition.
pub fn render_new_file(content: &str) -> Vec<DiffLine> {
    content
        .lines()
        .map(|line| DiffLine {
            raw_text: line.to_string(),
            class: LineClass::Addition,
        })
        .collect()
}

/// Working-tree diff for one file.
///
/// Falls back to the staged diff, then to the file's content for a file
/// that neither the index nor HEAD knows about.
pub fn diff_file(cli: &GitCli, path: &str) -> Result<Vec<DiffLine>> {
    let path = validate_relative_path(path)?;

    let unstaged = cli.run("diff", &["diff", "--", path], Bound::Local)?;
    if !unstaged.stdout.trim().is_empty() {
        return Ok(render(&unstaged.stdout));
    }

    let staged = cli.run("diff", &["diff", "--cached", "--", path], Bound::Local)?;
    if !staged.stdout.trim().is_empty() {
        return Ok(render(&staged.stdout));
    }

    Ok(untracked_content(cli.workdir(), path))
}

fn untracked_content(root: &Path, path: &str) -> Vec<DiffLine> {
    let full_path = root.join(path);
    match std::fs::read(&full_path) {
        Ok(bytes) => render_new_file(&String::from_utf8_lossy(&bytes)),
        Err(_) => vec![DiffLine {
            raw_text: "(file not found)".to_string(),
            class: LineClass::Context,
        }],
    }
}

/// Commit header, message and diffstat.
pub fn show_commit(cli: &GitCli, id: &str) -> Result<Vec<DiffLine>> {
    let id = parse_commit_id(id)?;
    let output = cli.run("show", &["show", "--stat", SHOW_FORMAT, id], Bound::Local)?;
    Ok(render(&output.stdout))
}

pub fn blame(cli: &GitCli, path: &str) -> Result<Vec<DiffLine>> {
    let path = validate_relative_path(path)?;
    let output = cli.run("blame", &["blame", "--", path], Bound::Local)?;
    Ok(render(&output.stdout))
}
