//! Session tuning knobs.
//!
//! Defaults match the desktop client's behaviour: a 500 ms refresh debounce,
//! 200 history entries, and a 10 second ceiling on local tool invocations.
//! Network operations (fetch/pull/push/clone) get their own, longer bound.

use std::time::Duration;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_HISTORY_LIMIT: usize = 200;
pub const DEFAULT_LOCAL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period after the last filesystem event before a refresh fires.
    pub debounce: Duration,
    /// Maximum number of commits kept in a snapshot's history.
    pub history_limit: usize,
    /// Ceiling for local command-line tool invocations.
    pub local_timeout: Duration,
    /// Ceiling for fetch/pull/push/clone.
    pub network_timeout: Duration,
    /// Program used for command-line tool invocations.
    pub git_program: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            history_limit: DEFAULT_HISTORY_LIMIT,
            local_timeout: DEFAULT_LOCAL_TIMEOUT,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            git_program: "git".to_string(),
        }
    }
}
