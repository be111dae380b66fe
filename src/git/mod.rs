//! Git access.
//!
//! - `repository`: the native backend handle (open/discover/init)
//! - `cli`: bounded command-line tool invocations
//! - `history`, `status`: read side, assembled into snapshots
//! - `operations`: the mutating side
//! - `render`: classified diff/blame/show output

pub mod cli;
pub mod history;
pub mod operations;
pub mod render;
pub mod repository;
pub mod status;

pub use cli::GitCli;
pub use repository::GitRepository;
