use kandra_core::{KandraError, Result};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Thin wrapper around a shallow `git clone` into `source_dir`. Git
/// cloning itself is an external collaborator's concern (out of scope for
/// the orchestration core); this is only the bit of plumbing the
/// Workspace Manager needs to populate `source/` before the Executor
/// starts.
pub async fn clone_source(clone_url: &str, source_dir: &Path) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(["clone", "--depth", "1", "--single-branch", clone_url, "."])
        .current_dir(source_dir);

    let output = tokio::time::timeout(CLONE_TIMEOUT, cmd.output())
        .await
        .map_err(|_| KandraError::Workspace("clone timeout - repository too large or network issue".to_string()))?
        .map_err(|e| KandraError::Workspace(format!("failed to launch git: {e}")))?;

    if !output.status.success() {
        return Err(KandraError::Workspace(format!(
            "git clone failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}
