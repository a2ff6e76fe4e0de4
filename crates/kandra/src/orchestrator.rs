use crate::scripted_llm::{ScriptedLlm, ScriptedTrace};
use anyhow::{Context, anyhow, bail};
use kandra_config::KandraConfig;
use kandra_core::{Job, JobId, JobStatus, MigrationPlan, kinds};
use kandra_events::{Emitter, EventBus, EventLog, InMemoryEventLog};
use kandra_executor::Executor;
use kandra_jobs::{ExecutionLock, JobAction, JobRegistry};
use kandra_workspace::{WorkspaceLayout, clone_source, workspace_dir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// The mutable per-job singletons the whole orchestrator is built from:
/// the job registry, the dual-write emitter (itself wrapping the Event
/// Log and Event Bus), and the single global execution slot. A real
/// deployment holds one of these for the process lifetime and lets the
/// HTTP/stream layer borrow a reference into it; this CLI binary is that
/// embedding, minus the HTTP surface.
pub struct Orchestrator {
    pub registry: Arc<JobRegistry>,
    pub log: Arc<dyn EventLog>,
    pub bus: Arc<EventBus>,
    pub emitter: Arc<Emitter>,
    pub lock: ExecutionLock,
    pub config: KandraConfig,
    pub workspace_base: PathBuf,
}

impl Orchestrator {
    pub fn new(config: KandraConfig) -> Self {
        let log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
        let bus = Arc::new(EventBus::new());
        let emitter = Arc::new(Emitter::new(log.clone(), bus.clone()));
        let registry = Arc::new(JobRegistry::new(emitter.clone()));
        let workspace_base = PathBuf::from(&config.workspace_base_path);
        Self { registry, log, bus, emitter, lock: ExecutionLock::new(), config, workspace_base }
    }

    /// Create a job and lay out its workspace. Cloning the source
    /// repository is an external collaborator's job (out of scope here);
    /// when `clone` is set this shells out to `git` via
    /// [`kandra_workspace::clone_source`], otherwise `source/` is left
    /// for the caller to populate.
    pub async fn create_job(&self, repo_url: &str, repo_name: &str, target_stack: &str, clone: bool) -> anyhow::Result<Job> {
        let job = self.registry.create(repo_url, repo_name, target_stack).await;
        let layout = WorkspaceLayout::new(workspace_dir(&self.workspace_base, repo_name, Some(&job.id.to_string())));
        layout.ensure_created().await.context("creating workspace layout")?;
        self.registry.set_workspace_path(job.id, layout.root.clone()).await?;

        if clone {
            clone_source(repo_url, &layout.source).await.context("cloning source repository")?;
        }
        Ok(self.registry.get(job.id).await?)
    }

    /// `CREATED -> PLANNING`: hands off to the (external) planner. This
    /// binary does not invoke a real planner itself; call
    /// [`Orchestrator::complete_planning`] with a plan document once one
    /// is available, the way the real planner's callback would.
    pub async fn start_planning(&self, job_id: JobId) -> anyhow::Result<Job> {
        self.emitter.emit(job_id, kinds::PLAN_GENERATING, serde_json::json!({})).await;
        Ok(self.registry.apply(job_id, JobAction::RequestPlan).await?)
    }

    /// `PLANNING -> AWAITING_APPROVAL`: load a plan document from
    /// `plan_path`, validate it, and emit `plan_complete` with the full
    /// plan as payload — the one event whose payload *must* carry the
    /// entire document, since `job approve` re-reads it from the log
    /// rather than trusting in-memory state.
    pub async fn complete_planning(&self, job_id: JobId, plan_path: &Path) -> anyhow::Result<Job> {
        let raw = std::fs::read_to_string(plan_path).with_context(|| format!("reading plan file {}", plan_path.display()))?;
        let plan: MigrationPlan = serde_json::from_str(&raw).context("parsing plan JSON")?;
        plan.validate().map_err(|e| anyhow!("invalid plan: {e}"))?;

        self.emitter.emit(job_id, kinds::PLAN_COMPLETE, serde_json::to_value(&plan)?).await;
        Ok(self.registry.apply(job_id, JobAction::PlanReady).await?)
    }

    pub async fn reject(&self, job_id: JobId) -> anyhow::Result<Job> {
        let job = self.registry.get(job_id).await?;
        if job.status != JobStatus::AwaitingApproval {
            bail!("cannot reject job {job_id} from state {:?}", job.status);
        }
        self.emitter.emit(job_id, kinds::PLAN_REJECTED, serde_json::json!({})).await;
        Ok(self.registry.apply(job_id, JobAction::Reject).await?)
    }

    /// `AWAITING_APPROVAL -> EXECUTING -> {COMPLETED, FAILED}`. Re-reads
    /// the latest `plan_complete` event rather than trusting any
    /// in-memory copy (per §4.7: "Approve must re-read the latest
    /// plan_complete event and parse it; missing/unparsable -> 400"),
    /// acquires the single global execution slot, resets `target/`, and
    /// drives the Executor with a scripted fixture trace standing in for
    /// the live model.
    pub async fn approve(&self, job_id: JobId, trace_path: &Path) -> anyhow::Result<()> {
        let job = self.registry.get(job_id).await?;
        if job.status != JobStatus::AwaitingApproval {
            bail!("cannot approve job {job_id} from state {:?}", job.status);
        }

        let plan = self.latest_plan(job_id).await?;
        let trace = ScriptedTrace::load(trace_path).context("loading scripted action trace")?;

        self.registry.apply(job_id, JobAction::Approve).await?;
        self.emitter.emit(job_id, kinds::PLAN_APPROVED, serde_json::json!({})).await;

        let workspace_path = job.workspace_path.clone().ok_or_else(|| anyhow!("job {job_id} has no workspace path"))?;
        let layout = WorkspaceLayout::new(workspace_path);
        layout.reset_target().await?;

        let _permit = self.lock.acquire().await;
        info!(%job_id, "execution lock acquired, starting execute_plan");

        let llm = Arc::new(ScriptedLlm::new(trace));
        let executor = Executor::new(self.config.clone(), llm, self.emitter.clone());

        match executor.execute_plan(job_id, &plan, &layout.target).await {
            Ok(()) => {
                self.registry.apply(job_id, JobAction::Complete).await?;
            }
            Err(e) => {
                self.registry.fail(job_id, e.to_string()).await?;
            }
        }
        Ok(())
    }

    async fn latest_plan(&self, job_id: JobId) -> anyhow::Result<MigrationPlan> {
        let events = self.log.list(job_id, None).await;
        let latest = events
            .into_iter()
            .rev()
            .find(|e| e.kind == kinds::PLAN_COMPLETE)
            .ok_or_else(|| anyhow!("job {job_id} has no plan_complete event yet"))?;
        serde_json::from_value(latest.payload).map_err(|e| anyhow!("plan_complete payload could not be parsed: {e}"))
    }
}
