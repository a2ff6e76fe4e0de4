use kandra_core::{JobId, kinds};
use kandra_events::Emitter;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// The activity the executor reports itself as being in, for the
/// watchdog's stuck diagnostics. Mirrors the three states the original
/// tracks: waiting on the model, inside a tool call, or setting up a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    WaitingForLlm,
    ExecutingTool,
    StartingPhase,
}

impl Activity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Activity::WaitingForLlm => "waiting_for_llm",
            Activity::ExecutingTool => "executing_tool",
            Activity::StartingPhase => "starting_phase",
        }
    }
}

struct State {
    activity: Activity,
    details: Value,
    started_at: Instant,
}

/// Shared state the watchdog polls and the step loop updates on every
/// activity change.
pub struct ActivityTracker {
    state: Mutex<State>,
    last_successful_action: Mutex<Option<String>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State { activity: Activity::StartingPhase, details: Value::Null, started_at: Instant::now() }),
            last_successful_action: Mutex::new(None),
        }
    }

    pub async fn set(&self, activity: Activity, details: Value) {
        let mut state = self.state.lock().await;
        state.activity = activity;
        state.details = details;
        state.started_at = Instant::now();
    }

    pub async fn record_success(&self, description: impl Into<String>) {
        *self.last_successful_action.lock().await = Some(description.into());
    }

    async fn elapsed(&self) -> Duration {
        self.state.lock().await.started_at.elapsed()
    }

    async fn diagnostics(&self, duration: Duration) -> (Activity, Value) {
        let state = self.state.lock().await;
        (state.activity, stuck_diagnostics(state.activity, &state.details, duration))
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-activity diagnostic message table, carried verbatim from the
/// original implementation's stuck-detection helper rather than
/// summarized.
fn stuck_diagnostics(activity: Activity, details: &Value, duration: Duration) -> Value {
    let mut diag = json!({
        "activity": activity.as_str(),
        "duration_seconds": duration.as_secs(),
        "details": details,
    });

    let (likely_cause, suggestion, context) = match activity {
        Activity::WaitingForLlm => (
            "LLM API not responding or taking too long".to_string(),
            "Check model API status, network connection, or prompt size".to_string(),
            json!({
                "prompt_size": details.get("prompt_size_chars"),
                "history_length": details.get("history_length"),
            }),
        ),
        Activity::ExecutingTool => {
            let tool = details.get("tool").and_then(Value::as_str).unwrap_or("unknown");
            let suggestion = if tool == "run_command" {
                let cmd = details
                    .get("args")
                    .and_then(|a| a.get("command"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                format!("Command '{cmd}' may be waiting for input or running indefinitely")
            } else {
                format!("Tool '{tool}' may have encountered an issue")
            };
            (format!("Tool '{tool}' is hanging or taking too long"), suggestion, Value::Null)
        }
        Activity::StartingPhase => (
            "Phase initialization stuck".to_string(),
            "Check for environment setup issues (venv, dependencies)".to_string(),
            Value::Null,
        ),
    };

    let obj = diag.as_object_mut().unwrap();
    obj.insert("likely_cause".to_string(), Value::String(likely_cause));
    obj.insert("suggestion".to_string(), Value::String(suggestion));
    if !context.is_null() {
        obj.insert("context".to_string(), context);
    }
    diag
}

/// Poll every `poll_interval`; once the current activity has run longer
/// than `stuck_threshold`, emit `stuck_warning` with diagnostics. Advisory
/// only — never cancels anything; the caller aborts this task's
/// `JoinHandle` once `execute_plan` returns.
pub async fn run(tracker: Arc<ActivityTracker>, emitter: Arc<Emitter>, job_id: JobId, poll_interval: Duration, stuck_threshold: Duration) {
    loop {
        tokio::time::sleep(poll_interval).await;
        let elapsed = tracker.elapsed().await;
        if elapsed > stuck_threshold {
            let (activity, diagnostics) = tracker.diagnostics(elapsed).await;
            let last_successful_action = tracker.last_successful_action.lock().await.clone();
            emitter
                .emit(
                    job_id,
                    kinds::STUCK_WARNING,
                    json!({
                        "activity": activity.as_str(),
                        "duration_seconds": elapsed.as_secs(),
                        "last_successful_action": last_successful_action,
                        "diagnostics": diagnostics,
                    }),
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_for_llm_diagnoses_model_hang() {
        let details = json!({"prompt_size_chars": 4000, "history_length": 6});
        let diag = stuck_diagnostics(Activity::WaitingForLlm, &details, Duration::from_secs(130));
        assert_eq!(diag["likely_cause"], "LLM API not responding or taking too long");
        assert_eq!(diag["context"]["prompt_size"], 4000);
    }

    #[test]
    fn executing_run_command_names_the_hanging_command() {
        let details = json!({"tool": "run_command", "args": {"command": "npm install"}});
        let diag = stuck_diagnostics(Activity::ExecutingTool, &details, Duration::from_secs(200));
        assert!(diag["suggestion"].as_str().unwrap().contains("npm install"));
    }

    #[test]
    fn starting_phase_suggests_environment_issues() {
        let diag = stuck_diagnostics(Activity::StartingPhase, &Value::Null, Duration::from_secs(121));
        assert!(diag["suggestion"].as_str().unwrap().contains("environment"));
    }

    #[tokio::test(start_paused = true)]
    async fn emits_stuck_warning_once_threshold_is_crossed() {
        use kandra_events::{EventBus, InMemoryEventLog};
        use kandra_core::JobId;

        let log = Arc::new(InMemoryEventLog::new());
        let bus = Arc::new(EventBus::new());
        let emitter = Arc::new(Emitter::new(log.clone(), bus));
        let job_id = JobId::new();
        let tracker = Arc::new(ActivityTracker::new());
        tracker.set(Activity::WaitingForLlm, json!({})).await;

        let handle = tokio::spawn(run(tracker, emitter, job_id, Duration::from_millis(10), Duration::from_millis(30)));
        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        handle.abort();

        let events = log.list(job_id, None).await;
        assert!(events.iter().any(|e| e.kind == kinds::STUCK_WARNING));
    }
}
