//! git-desk: a live view over a local git repository.
//!
//! The core keeps one snapshot of repository status current while three
//! things change it: operations issued through the session, edits made to
//! the working tree by other programs, and the object database itself.
//! `session` ties the pieces together; `routes` exposes them over HTTP.

pub mod config;
pub mod error;
pub mod git;
pub mod models;
pub mod routes;
pub mod session;
pub mod watcher;
