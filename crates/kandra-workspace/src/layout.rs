use kandra_core::{KandraError, Result};
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// The fixed `source/`, `target/`, `.kandra/`, `reports/` partition every
/// job's workspace is built around.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    pub source: PathBuf,
    pub target: PathBuf,
    pub meta: PathBuf,
    pub reports: PathBuf,
}

/// Replace characters that would be unsafe as path components.
fn sanitize_repo_name(repo_name: &str) -> String {
    repo_name.replace(['/', '\\'], "_")
}

/// Derive the unique workspace directory for a repo, under `base`. A
/// caller-supplied `session_id` pins the suffix (useful for tests and for
/// resuming a known workspace); otherwise a fresh one is generated.
pub fn workspace_dir(base: &Path, repo_name: &str, session_id: Option<&str>) -> PathBuf {
    let safe_name = sanitize_repo_name(repo_name);
    let suffix = session_id
        .map(|s| s.to_string())
        .unwrap_or_else(|| Ulid::new().to_string()[..8].to_lowercase());
    base.join(format!("{safe_name}_{suffix}"))
}

impl WorkspaceLayout {
    pub fn new(root: PathBuf) -> Self {
        Self {
            source: root.join("source"),
            target: root.join("target"),
            meta: root.join(".kandra"),
            reports: root.join("reports"),
            root,
        }
    }

    /// Create all four subdirectories if absent. Idempotent.
    pub async fn ensure_created(&self) -> Result<()> {
        for dir in [&self.source, &self.target, &self.meta, &self.reports] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| KandraError::Workspace(format!("creating {}: {e}", dir.display())))?;
        }
        Ok(())
    }

    /// Reset `target/` to empty before a run starts. `source/` is never
    /// touched here — it is cloned once and treated as read-only for the
    /// lifetime of the workspace.
    pub async fn reset_target(&self) -> Result<()> {
        if self.target.exists() {
            tokio::fs::remove_dir_all(&self.target)
                .await
                .map_err(|e| KandraError::Workspace(format!("clearing target: {e}")))?;
        }
        tokio::fs::create_dir_all(&self.target)
            .await
            .map_err(|e| KandraError::Workspace(format!("recreating target: {e}")))?;
        Ok(())
    }

    pub async fn remove_all(&self) -> Result<()> {
        if self.root.exists() {
            tokio::fs::remove_dir_all(&self.root)
                .await
                .map_err(|e| KandraError::Workspace(format!("removing workspace: {e}")))?;
        }
        Ok(())
    }
}
