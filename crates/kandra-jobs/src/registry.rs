use crate::transition::{self, JobAction};
use kandra_core::{Job, JobId, JobStatus, KandraError, Result, kinds};
use kandra_events::Emitter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory job store plus the transition table. Holds every job for the
/// lifetime of the process; nothing here persists across a restart.
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Job>>,
    emitter: Arc<Emitter>,
}

impl JobRegistry {
    pub fn new(emitter: Arc<Emitter>) -> Self {
        Self { jobs: Mutex::new(HashMap::new()), emitter }
    }

    /// Register a new job in `Created` state and emit `job_created`.
    pub async fn create(&self, repo_url: impl Into<String>, repo_name: impl Into<String>, target_stack: impl Into<String>) -> Job {
        let job = Job::new(repo_url, repo_name, target_stack);
        self.jobs.lock().await.insert(job.id, job.clone());
        self.emitter
            .emit(job.id, kinds::JOB_CREATED, serde_json::json!({"repo_url": job.repo_url, "target_stack": job.target_stack}))
            .await;
        job
    }

    pub async fn get(&self, id: JobId) -> Result<Job> {
        self.jobs
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| KandraError::JobNotFound(id.to_string()))
    }

    pub async fn list(&self) -> Vec<Job> {
        self.jobs.lock().await.values().cloned().collect()
    }

    /// Drive `id` through `action`, persisting the new status and emitting
    /// `status_changed`. Rejected transitions leave the job untouched.
    pub async fn apply(&self, id: JobId, action: JobAction) -> Result<Job> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or_else(|| KandraError::JobNotFound(id.to_string()))?;
        let from = job.status;
        let to = transition::apply_for(&id.to_string(), from, action)?;
        job.status = to;
        job.updated_at = chrono::Utc::now();
        let updated = job.clone();
        drop(jobs);

        self.emitter
            .emit(id, kinds::STATUS_CHANGED, serde_json::json!({"from": from.to_string(), "to": to.to_string()}))
            .await;
        Ok(updated)
    }

    /// Record a failure reason alongside the `Failed` transition.
    pub async fn fail(&self, id: JobId, reason: impl Into<String>) -> Result<Job> {
        let reason = reason.into();
        {
            let mut jobs = self.jobs.lock().await;
            if let Some(job) = jobs.get_mut(&id) {
                job.error = Some(reason.clone());
            }
        }
        let job = self.apply(id, JobAction::Fail).await?;
        self.emitter.emit(id, kinds::ERROR, serde_json::json!({"message": reason})).await;
        Ok(job)
    }

    /// Set the job's workspace path. Per the data model's invariant,
    /// `workspace_path` is immutable once set — a second call with a
    /// different path is a bug in the caller, not a legitimate update.
    pub async fn set_workspace_path(&self, id: JobId, path: PathBuf) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or_else(|| KandraError::JobNotFound(id.to_string()))?;
        if let Some(existing) = &job.workspace_path {
            if existing != &path {
                return Err(KandraError::Workspace(format!(
                    "job {id} already has workspace path {} (attempted to set {})",
                    existing.display(),
                    path.display()
                )));
            }
            return Ok(());
        }
        job.workspace_path = Some(path);
        Ok(())
    }

    pub async fn status(&self, id: JobId) -> Result<JobStatus> {
        Ok(self.get(id).await?.status)
    }
}
