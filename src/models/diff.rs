//! Rendered diff/blame/show lines.
//!
//! - `DiffLine`: one line of tool output with its classification
//! - `LineClass`: addition, deletion, hunk header, metadata, or context
//!
//! Produced per inspection request; never stored in a snapshot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffLine {
    pub raw_text: String,
    pub class: LineClass,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LineClass {
    Addition,
    Deletion,
    HunkHeader,
    Metadata,
    Context,
}
