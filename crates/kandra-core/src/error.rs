use crate::job::JobStatus;

/// Flat, typed error taxonomy for the orchestration core.
///
/// One enum for the whole crate family, mirrored after the convention of
/// collecting every domain error into a single `thiserror` type rather than
/// a hierarchy of per-module error types.
#[derive(Debug, thiserror::Error)]
pub enum KandraError {
    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("cannot {action} from state {from:?} (job {job})")]
    InvalidTransition {
        job: String,
        from: JobStatus,
        action: &'static str,
    },

    #[error("job {0} has no plan_complete event yet")]
    PlanNotFound(String),

    #[error("plan payload could not be parsed: {0}")]
    PlanParseError(String),

    #[error("path escapes sandbox root: {0}")]
    SandboxViolation(String),

    #[error("Permission Denied: content references the source tree ({0})")]
    SourceLeak(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file is not text (binary): {0}")]
    BinaryFile(String),

    #[error("file too large: {path} ({size} bytes, limit {limit})")]
    FileTooLarge {
        path: String,
        size: usize,
        limit: usize,
    },

    #[error("command rejected: {0}")]
    CommandRejected(String),

    #[error("INTELLIGENCE ALERT: {reason}\nADVICE: Use non-interactive flags (e.g. -y, --yes).")]
    IntelligenceAlert { reason: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("phase {phase} exceeded max steps ({max})")]
    MaxStepsExceeded { phase: String, max: u32 },

    #[error("agent gave up on phase {phase}: {reason}")]
    AgentGaveUp { phase: String, reason: String },

    #[error("execution lock is already held")]
    ExecutionLockHeld,

    #[error("llm call failed: {0}")]
    LlmError(String),

    #[error("workspace error: {0}")]
    Workspace(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KandraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_mentions_states() {
        let err = KandraError::InvalidTransition {
            job: "01H".into(),
            from: JobStatus::Created,
            action: "approve",
        };
        let msg = err.to_string();
        assert!(msg.contains("approve"));
        assert!(msg.contains("01H"));
    }

    #[test]
    fn intelligence_alert_carries_advice() {
        let err = KandraError::IntelligenceAlert {
            reason: "stuck waiting for input".into(),
        };
        assert!(err.to_string().contains("non-interactive"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KandraError>();
    }
}
