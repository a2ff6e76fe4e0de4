//! The scenario-aware shell tool (`run_command`): process-group
//! supervision, readiness/interactive-prompt detection, smart exit, and
//! the language-lock / source-leak post-command audits.

pub mod audit;
pub mod patterns;
pub mod process;
pub mod scenario;

use kandra_tools::ToolResult;
use patterns::{HEAVY_KEYWORDS, matches_any};
use scenario::{DEFAULT_TIMEOUT_SECS, HEAVY_TIMEOUT_SECS, run_scenario};
use std::path::Path;
use std::time::Duration;

fn effective_timeout(command: &str, caller_timeout: Option<f64>) -> Duration {
    let floor = if matches_any(command, HEAVY_KEYWORDS) {
        HEAVY_TIMEOUT_SECS
    } else {
        DEFAULT_TIMEOUT_SECS
    };
    let caller = caller_timeout.map(|t| t.max(0.0) as u64).unwrap_or(0);
    Duration::from_secs(floor.max(caller))
}

/// Run `command` inside `cwd` (the sandbox root) under the full
/// scenario-aware policy described in the shell tool's design, then apply
/// the language-lock and source-leak post-audits before returning a
/// uniform [`ToolResult`].
pub async fn run_command(cwd: &Path, command: &str, timeout: Option<f64>, whitelist: &[String]) -> ToolResult {
    if command.contains("../") {
        return ToolResult::err(
            "Permission Denied: commands may not reference paths outside the sandbox (../)".to_string(),
        );
    }

    let effective = effective_timeout(command, timeout);
    let outcome = match run_scenario(command, cwd, effective).await {
        Ok(o) => o,
        Err(e) => return ToolResult::err(format!("failed to launch command: {e}")),
    };

    if let Some(reason) = outcome.hang_reason {
        let mut result = ToolResult::err(format!(
            "INTELLIGENCE ALERT: {reason}\nADVICE: Use non-interactive flags (e.g. -y, --yes)."
        ))
        .with_metadata("intelligence_fail", true)
        .with_metadata("exit_code", outcome.exit_code);
        result.output = audit::truncate_output(&combined(&outcome.stdout, &outcome.stderr));
        return result;
    }

    let combined_text = combined(&outcome.stdout, &outcome.stderr);
    let leak_found = audit::combined_output_leaks_source(&outcome.stdout, &outcome.stderr);
    let lock_violations = audit::find_lock_violations(cwd, whitelist).await;

    let mut result = if outcome.exit_code != 0 {
        let mut msg = format!("Command exited with code {}:\n{}", outcome.exit_code, audit::truncate_output(&combined_text));
        if leak_found {
            msg.push_str("\n[CRITICAL] Output references the read-only source tree (../source).");
        }
        ToolResult::err(msg).with_metadata("exit_code", outcome.exit_code)
    } else if leak_found {
        ToolResult::err(
            "CRITICAL: command output references the read-only source tree (../source). \
             The target must be self-contained; do not wrap or import legacy code."
                .to_string(),
        )
        .with_metadata("source_leak", true)
        .with_metadata("exit_code", 0)
    } else {
        ToolResult::ok(if combined_text.is_empty() {
            "Success".to_string()
        } else {
            audit::truncate_output(&combined_text)
        })
        .with_metadata("exit_code", 0)
    };

    if !lock_violations.is_empty() {
        result = result
            .with_metadata("lock_warning", true)
            .with_metadata("files", serde_json::json!(lock_violations));
    }

    result
}

fn combined(stdout: &str, stderr: &str) -> String {
    if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heavy_keyword_raises_timeout_floor() {
        assert_eq!(effective_timeout("npm install", None), Duration::from_secs(HEAVY_TIMEOUT_SECS));
        assert_eq!(effective_timeout("echo hi", None), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn caller_timeout_only_raises_not_lowers_the_floor() {
        assert_eq!(effective_timeout("echo hi", Some(5.0)), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(effective_timeout("echo hi", Some(500.0)), Duration::from_secs(500));
    }

    #[tokio::test]
    async fn dot_dot_slash_in_command_is_rejected_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_command(dir.path(), "cat ../source/secret.py", None, &[]).await;
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("Permission Denied"));
    }

    #[tokio::test]
    async fn successful_command_reports_zero_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_command(dir.path(), "echo hello", None, &[]).await;
        assert!(result.is_success());
        assert_eq!(result.metadata.get("exit_code").unwrap(), 0);
        assert!(result.output.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_command(dir.path(), "exit 2", None, &[]).await;
        assert!(!result.is_success());
        assert_eq!(result.metadata.get("exit_code").unwrap(), 2);
    }

    #[tokio::test]
    async fn lock_violation_is_a_non_blocking_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("legacy.py"), "x").unwrap();
        let whitelist = vec![".ts".to_string()];
        let result = run_command(dir.path(), "echo ok", None, &whitelist).await;
        assert!(result.is_success());
        assert_eq!(result.metadata.get("lock_warning").unwrap(), true);
    }
}
