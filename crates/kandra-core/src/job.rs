use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use ulid::Ulid;

/// Opaque, lexicographically time-sortable job identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(Ulid);

impl JobId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Ulid::from_str(s)?))
    }
}

/// Lifecycle states of a migration job. See the state graph in the
/// orchestration engine's transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Planning,
    AwaitingApproval,
    Executing,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Created => "created",
            JobStatus::Planning => "planning",
            JobStatus::AwaitingApproval => "awaiting_approval",
            JobStatus::Executing => "executing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A migration job record. Owned by the job state machine; read by anyone
/// holding a [`JobId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub repo_url: String,
    pub repo_name: String,
    pub target_stack: String,
    pub workspace_path: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(repo_url: impl Into<String>, repo_name: impl Into<String>, target_stack: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            status: JobStatus::Created,
            repo_url: repo_url.into(),
            repo_name: repo_name.into(),
            target_stack: target_stack.into(),
            workspace_path: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_round_trips_through_display_and_from_str() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn job_ids_sort_by_creation_order() {
        let a = JobId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = JobId::new();
        assert!(a < b);
    }

    #[test]
    fn status_display_is_snake_case() {
        assert_eq!(JobStatus::AwaitingApproval.to_string(), "awaiting_approval");
    }

    #[test]
    fn new_job_starts_created_with_no_workspace() {
        let job = Job::new("https://example.com/repo.git", "repo", "Rust + Axum");
        assert_eq!(job.status, JobStatus::Created);
        assert!(job.workspace_path.is_none());
        assert!(job.error.is_none());
    }
}
