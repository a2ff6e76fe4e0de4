use crate::patterns::{COMPLEX_MARKERS, INTERACTIVE_PATTERNS, READY_PATTERNS, matches_any};
use crate::process::{kill_process_group, spawn_in_process_group};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const HEAVY_TIMEOUT_SECS: u64 = 300;
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const READY_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Everything the line scanner and the completion race need to agree on,
/// shared between the two reader tasks and the main waiter.
#[derive(Default)]
struct Shared {
    stdout: Mutex<String>,
    stderr: Mutex<String>,
    ready: AtomicBool,
    interactive_reason: Mutex<Option<String>>,
}

impl Shared {
    fn take_interactive_reason(&self) -> Option<String> {
        self.interactive_reason.lock().unwrap().take()
    }
}

/// Outcome of one scenario-aware execution, before output-hygiene and
/// audit post-processing (done by the caller in `kandra_shell::lib`).
pub struct CommandOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Normalized: 0 on success (including a ready-triggered cleanup
    /// kill), non-zero on failure.
    pub exit_code: i32,
    /// Set when the process was killed for hanging on an interactive
    /// prompt or for exceeding its timeout with no readiness signal.
    pub hang_reason: Option<String>,
}

async fn read_lines<R: AsyncRead + Unpin>(stream: R, shared: Arc<Shared>, is_stderr: bool) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                {
                    let mut buf = if is_stderr {
                        shared.stderr.lock().unwrap()
                    } else {
                        shared.stdout.lock().unwrap()
                    };
                    buf.push_str(&line);
                    buf.push('\n');
                }
                if matches_any(&line, READY_PATTERNS) {
                    shared.ready.store(true, Ordering::SeqCst);
                }
                if matches_any(&line, INTERACTIVE_PATTERNS) {
                    let mut reason = shared.interactive_reason.lock().unwrap();
                    if reason.is_none() {
                        *reason = Some(format!("stuck waiting for input: \"{}\"", line.trim()));
                    }
                }
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }
}

/// Run `command` inside `cwd` under the full scenario-aware policy:
/// readiness detection, interactive-prompt kill, smart exit, and the
/// completion race against `timeout`.
pub async fn run_scenario(command: &str, cwd: &Path, timeout: Duration) -> std::io::Result<CommandOutcome> {
    let mut child = spawn_in_process_group(command, cwd)?;
    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let shared = Arc::new(Shared::default());
    let stdout_task = tokio::spawn(read_lines(stdout, shared.clone(), false));
    let stderr_task = tokio::spawn(read_lines(stderr, shared.clone(), true));

    let is_complex = matches_any(command, COMPLEX_MARKERS);
    let deadline = Instant::now() + timeout;

    let mut hang_reason = None;
    let mut our_cleanup_kill = false;
    let exit_status;

    loop {
        if let Some(status) = child.try_wait()? {
            exit_status = Some(status);
            break;
        }

        if let Some(reason) = shared.take_interactive_reason() {
            kill_process_group(&mut child);
            hang_reason = Some(reason);
            exit_status = child.wait().await.ok();
            break;
        }

        if shared.ready.load(Ordering::SeqCst) {
            if is_complex {
                // Complex commands embed their own verification; let them
                // run to natural completion regardless of the timeout.
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
            tokio::time::sleep(READY_GRACE_PERIOD).await;
            kill_process_group(&mut child);
            our_cleanup_kill = true;
            exit_status = child.wait().await.ok();
            break;
        }

        if Instant::now() >= deadline {
            kill_process_group(&mut child);
            hang_reason = Some(format!(
                "Command timed out after {:.0}s with no readiness signal observed",
                timeout.as_secs_f64()
            ));
            exit_status = child.wait().await.ok();
            break;
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }

    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let exit_code = if our_cleanup_kill {
        0
    } else {
        match exit_status.and_then(|s| s.code()) {
            Some(code) => code,
            None => 1, // terminated by signal, no exit code to report
        }
    };

    Ok(CommandOutcome {
        stdout: shared.stdout.lock().unwrap().clone(),
        stderr: shared.stderr.lock().unwrap().clone(),
        exit_code,
        hang_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_signal_triggers_prompt_cleanup_within_two_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let outcome = run_scenario(
            "echo 'Listening on port 9001' && sleep 30",
            dir.path(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.hang_reason.is_none());
        assert!(outcome.stdout.contains("Listening on port 9001"));
    }

    #[tokio::test]
    async fn interactive_prompt_is_killed_within_two_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let outcome = run_scenario("echo 'Continue? (y/n)' && sleep 30", dir.path(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(3));
        assert!(outcome.hang_reason.is_some());
        assert!(outcome.hang_reason.unwrap().contains("stuck waiting for input"));
    }

    #[tokio::test]
    async fn natural_exit_reports_real_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_scenario("exit 3", dir.path(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert!(outcome.hang_reason.is_none());
    }

    #[tokio::test]
    async fn timeout_with_no_ready_signal_is_killed_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_scenario("sleep 30", dir.path(), Duration::from_millis(300)).await.unwrap();
        assert!(outcome.hang_reason.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn complex_command_waits_for_natural_exit_after_ready() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_scenario(
            "echo 'Server started' && sleep 1 && echo done",
            dir.path(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.contains("done"));
    }
}
