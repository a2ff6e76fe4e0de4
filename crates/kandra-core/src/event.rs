use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::job::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Ulid);

impl EventId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Ulid::from_str(s)?))
    }
}

/// A single append-only log entry. Payloads are open JSON trees: callers
/// are expected to tolerate unknown keys for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub job_id: JobId,
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    /// Insertion order within the job's log; breaks timestamp ties.
    pub seq: u64,
}

/// The minimum event-kind taxonomy the dashboard relies on. Kept as plain
/// string constants rather than a closed enum so new kinds can be emitted
/// without a crate-wide recompile; readers still match on these.
pub mod kinds {
    pub const JOB_CREATED: &str = "job_created";
    pub const STATUS_CHANGED: &str = "status_changed";
    pub const PLAN_GENERATING: &str = "plan_generating";
    pub const PLAN_CHUNK: &str = "plan_chunk";
    pub const PLAN_COMPLETE: &str = "plan_complete";
    pub const PLAN_APPROVED: &str = "plan_approved";
    pub const PLAN_REJECTED: &str = "plan_rejected";
    pub const PHASE_STARTED: &str = "phase_started";
    pub const PHASE_COMPLETED: &str = "phase_completed";
    pub const PHASE_ERROR: &str = "phase_error";
    pub const AGENT_THOUGHT: &str = "agent_thought";
    pub const TERMINAL_OUTPUT: &str = "terminal_output";
    pub const FILE_MODIFIED: &str = "file_modified";
    pub const CLEANUP_STATUS: &str = "cleanup_status";
    pub const ACTIVITY_UPDATE: &str = "activity_update";
    pub const STUCK_WARNING: &str = "stuck_warning";
    pub const EXECUTION_COMPLETE: &str = "execution_complete";
    pub const EXECUTION_ERROR: &str = "execution_error";
    pub const AUDIT_STARTED: &str = "audit_started";
    pub const AUDIT_COMPLETE: &str = "audit_complete";
    pub const AUDIT_ERROR: &str = "audit_error";
    pub const PR_CREATED: &str = "pr_created";
    pub const ERROR: &str = "error";
}
