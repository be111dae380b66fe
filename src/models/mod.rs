//! Data transfer objects shared by the core and the HTTP layer.
//!
//! - `status`: StatusSnapshot and its parts (FileChange, BranchInfo, ...)
//! - `commit`: CommitInfo for the history list
//! - `diff`: DiffLine and LineClass for rendered tool output
//! - `operation`: the closed set of mutating operations and their outcome
//! - `repository`: RepositoryInfo and session-switching request bodies

pub mod commit;
pub mod diff;
pub mod operation;
pub mod repository;
pub mod status;

pub use commit::*;
pub use diff::*;
pub use operation::*;
pub use repository::*;
pub use status::*;
