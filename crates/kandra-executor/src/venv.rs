use crate::wrappers::StackFamily;
use std::path::Path;
use tokio::process::Command;
use tracing::warn;

/// Create `target/.venv` and upgrade pip, best-effort, before the first
/// phase of a Python-ish migration. Failure here is logged and swallowed —
/// the first real `pip`/`pytest` call will surface the underlying problem
/// to the agent directly rather than aborting the run on tooling absence.
pub async fn ensure_python_venv(target_dir: &Path, family: StackFamily) {
    if family != StackFamily::Python {
        return;
    }
    if target_dir.join(".venv").exists() {
        return;
    }

    let create = Command::new("python3").args(["-m", "venv", ".venv"]).current_dir(target_dir).output().await;
    match create {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            warn!(stderr = %String::from_utf8_lossy(&output.stderr), "venv creation failed, continuing without it");
            return;
        }
        Err(e) => {
            warn!(error = %e, "failed to launch python3 to create venv");
            return;
        }
    }

    let upgrade = Command::new("./.venv/bin/pip")
        .args(["install", "--upgrade", "pip"])
        .current_dir(target_dir)
        .output()
        .await;
    if let Err(e) = upgrade {
        warn!(error = %e, "failed to upgrade pip in new venv");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_python_stacks_are_skipped_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        ensure_python_venv(dir.path(), StackFamily::RustGo).await;
        assert!(!dir.path().join(".venv").exists());
    }

    #[tokio::test]
    async fn existing_venv_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join(".venv")).await.unwrap();
        ensure_python_venv(dir.path(), StackFamily::Python).await;
        assert!(dir.path().join(".venv").is_dir());
    }
}
