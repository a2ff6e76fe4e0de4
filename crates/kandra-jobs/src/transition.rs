use kandra_core::{JobStatus, KandraError, Result};

/// Events that drive a job through its lifecycle. Kept separate from
/// [`JobStatus`] itself so the transition table reads as a small graph
/// rather than a grab-bag of setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    RequestPlan,
    PlanReady,
    Approve,
    Reject,
    StartExecution,
    Complete,
    Fail,
}

impl JobAction {
    fn name(self) -> &'static str {
        match self {
            JobAction::RequestPlan => "request_plan",
            JobAction::PlanReady => "plan_ready",
            JobAction::Approve => "approve",
            JobAction::Reject => "reject",
            JobAction::StartExecution => "start_execution",
            JobAction::Complete => "complete",
            JobAction::Fail => "fail",
        }
    }
}

/// Apply `action` to `from`, returning the resulting status or an
/// [`KandraError::InvalidTransition`] if the combination isn't in the graph:
///
/// ```text
///   Created, Failed  --RequestPlan-----> Planning
///   Planning         --PlanReady-------> AwaitingApproval
///   AwaitingApproval --Approve---------> Executing        (StartExecution is folded into Approve)
///   AwaitingApproval --Reject----------> Created
///   Executing        --Complete--------> Completed
///   *                --Fail------------> Failed
/// ```
///
/// `Completed` is terminal. `Failed` is terminal except that re-planning
/// (`RequestPlan`) is always allowed from it — a rerun doesn't retry the
/// failed execution, it starts a fresh plan against the job's existing
/// workspace.
pub fn apply(from: JobStatus, action: JobAction) -> std::result::Result<JobStatus, (JobStatus, &'static str)> {
    use JobAction::*;
    use JobStatus::*;
    match (from, action) {
        (Created, RequestPlan) | (Failed, RequestPlan) => Ok(Planning),
        (Planning, PlanReady) => Ok(AwaitingApproval),
        (AwaitingApproval, Approve) => Ok(Executing),
        (AwaitingApproval, StartExecution) => Ok(Executing),
        (AwaitingApproval, Reject) => Ok(Created),
        (Executing, Complete) => Ok(Completed),
        (Completed, Fail) | (Failed, Fail) => Err((from, action.name())),
        (_, Fail) => Ok(Failed),
        (_, _) => Err((from, action.name())),
    }
}

/// Same as [`apply`] but wraps the failure into a [`KandraError`] carrying
/// the job id, for callers that already know which job they're mutating.
pub fn apply_for(job_id: &str, from: JobStatus, action: JobAction) -> Result<JobStatus> {
    apply(from, action).map_err(|(from, action)| KandraError::InvalidTransition {
        job: job_id.to_string(),
        from,
        action,
    })
}
