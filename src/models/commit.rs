use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One entry of the history list. Identity is `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub summary: String,
    pub author_name: String,
    pub author_email: String,
    pub authored_at: DateTime<FixedOffset>,
    pub relative_time: String,
}
