use crate::history::TurnHistory;
use crate::llm::LlmClient;
use crate::loop_detect::ActionHistory;
use crate::prompt::build_context;
use crate::venv;
use crate::watchdog::{self, Activity, ActivityTracker};
use crate::wrappers::{self, StackFamily};
use crate::{purge, similarity, test_gate};
use kandra_config::KandraConfig;
use kandra_core::{AgentAction, AgentStatus, JobId, KandraError, MigrationPlan, Phase, Result, ToolArgs, ToolName, kinds};
use kandra_events::Emitter;
use kandra_tools::ToolResult;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed system instruction sent with every ReAct step. Describes the
/// agent's role and the JSON contract it must return; the phase-specific
/// content lives in the per-step preamble built by [`crate::prompt`].
const SYSTEM_PROMPT: &str = "\
You are Kandra's migration executor, an autonomous coding agent working inside a sandboxed \
workspace. You drive a reimplementation of a legacy codebase into a target technology stack, \
one phase at a time, by calling exactly one of four tools per step or signaling completion. \
You must always respond with a single JSON object of the shape: \
{\"thought\": string, \"tool\"?: \"list_dir\"|\"read_file\"|\"write_file\"|\"run_command\", \
\"args\"?: {...}, \"status\"?: \"complete\"|\"incomplete\"|\"blocked\"}. \
Never wrap legacy code from ../source/ into the target; rewrite logic locally. \
Respect the allowed file extensions for the target stack.";

/// Stack-derived facts that stay fixed for the whole plan execution:
/// smart-wrapper family, the language-lock whitelist, and the test
/// framework/package manager the heuristic gate and wrappers key off.
struct StackContext {
    family: StackFamily,
    whitelist: Vec<String>,
    package_manager: String,
    test_framework: Option<String>,
    target_stack: String,
}

/// Drives `execute_plan` for one job. Owned for the duration of a single
/// execution; holds no per-job state itself beyond its constructor
/// arguments, so a fresh `Executor` can be built per job or one can be
/// reused serially (the global `ExecutionLock` upstream guarantees only
/// one `execute_plan` call is ever in flight at a time).
pub struct Executor {
    config: KandraConfig,
    llm: Arc<dyn LlmClient>,
    emitter: Arc<Emitter>,
}

impl Executor {
    pub fn new(config: KandraConfig, llm: Arc<dyn LlmClient>, emitter: Arc<Emitter>) -> Self {
        Self { config, llm, emitter }
    }

    /// Run every phase of `plan` against `target_dir` in order. Returns
    /// `Ok(())` on success; on any phase failure, emits `execution_error`
    /// and returns the typed error that failed it — the caller (the Job
    /// State Machine) is responsible for the `Failed` transition. Nothing
    /// needs to "escape" an async task boundary (see the Design Notes on
    /// the original's ambiguous exception path).
    pub async fn execute_plan(&self, job_id: JobId, plan: &MigrationPlan, target_dir: &Path) -> Result<()> {
        plan.validate().map_err(KandraError::PlanParseError)?;

        let ctx = StackContext {
            family: wrappers::detect_stack_family(&plan.transformation.target_stack),
            whitelist: plan.transformation.file_extensions.clone(),
            package_manager: plan.transformation.package_manager.clone().unwrap_or_else(|| "npm".to_string()),
            test_framework: plan.transformation.test_framework.clone(),
            target_stack: plan.transformation.target_stack.clone(),
        };

        venv::ensure_python_venv(target_dir, ctx.family).await;

        let tracker = Arc::new(ActivityTracker::new());
        let watchdog_handle = tokio::spawn(watchdog::run(
            tracker.clone(),
            self.emitter.clone(),
            job_id,
            Duration::from_secs(self.config.watchdog_poll_interval_secs),
            Duration::from_secs(self.config.watchdog_stuck_threshold_secs),
        ));

        let mut outcome = Ok(());
        for phase in &plan.phases {
            self.set_activity(job_id, &tracker, Activity::StartingPhase, json!({"phase": phase.title})).await;
            if let Err(e) = self.run_phase(job_id, phase, target_dir, &ctx, &tracker).await {
                outcome = Err(e);
                break;
            }
        }

        // Finally-equivalent cleanup: the watchdog never needs to survive
        // past the phase loop, success or failure.
        watchdog_handle.abort();

        match &outcome {
            Ok(()) => {
                info!(%job_id, "execution complete");
                self.emitter.emit(job_id, kinds::EXECUTION_COMPLETE, json!({})).await;
            }
            Err(e) => {
                warn!(%job_id, error = %e, "execution failed");
                self.emitter.emit(job_id, kinds::EXECUTION_ERROR, json!({"message": e.to_string()})).await;
            }
        }
        outcome
    }

    async fn run_phase(&self, job_id: JobId, phase: &Phase, target_dir: &Path, ctx: &StackContext, tracker: &Arc<ActivityTracker>) -> Result<()> {
        let purged = purge::purge_pollution(target_dir, &ctx.whitelist).await;
        if !purged.is_empty() {
            self.emitter
                .emit(job_id, kinds::CLEANUP_STATUS, json!({"purged_count": purged.len(), "files": purged}))
                .await;
        }

        self.emitter
            .emit(job_id, kinds::PHASE_STARTED, json!({"phase_id": phase.id, "title": phase.title}))
            .await;

        let mut baseline_failure = String::new();
        if phase.implies_verification() {
            let (passed, tail) = self.run_verification_gate(phase, ctx, target_dir).await;
            if !passed {
                baseline_failure = format!("Baseline verification failed before this phase started:\n{tail}");
            }
        }

        let mut history = TurnHistory::new();
        let mut action_history = ActionHistory::new();
        let mut previous_thought: Option<String> = None;
        let mut lessons: Vec<String> = Vec::new();
        let mut last_failed_command: Option<String> = None;
        let mut consecutive_failures: u32 = 0;
        let mut purge_reported = false;

        for step in 0..self.config.max_steps as usize {
            let loop_warning = action_history.warning().unwrap_or_default();
            let reflection = reflection_digest(&lessons, &baseline_failure);
            let purge_for_preamble = if purge_reported { None } else { Some(purged.as_slice()) };

            let preamble = build_context(
                phase,
                &ctx.target_stack,
                &ctx.whitelist,
                purge_for_preamble,
                &loop_warning,
                &reflection,
            );
            purge_reported = true;

            let turns = history.with_preamble(&preamble);
            self.set_activity(
                job_id,
                tracker,
                Activity::WaitingForLlm,
                json!({"prompt_size_chars": preamble.len(), "history_length": turns.len()}),
            )
            .await;

            let action = match self.llm.generate(SYSTEM_PROMPT, &turns).await {
                Ok(a) => a,
                Err(e) => {
                    warn!(%job_id, phase = %phase.title, error = %e, "LLM call failed for this step");
                    history.push_user(format!("Your previous response could not be parsed: {e}. Respond with valid JSON."));
                    continue;
                }
            };
            tracker.record_success(format!("step {step}: model responded")).await;

            // Thought-loop check: a near-identical thought to last step
            // means the model is stuck narrating without progress.
            if let Some(prev) = &previous_thought {
                if similarity::ratio(prev, &action.thought) > self.config.thought_similarity_threshold {
                    debug!(%job_id, phase = %phase.title, "thought loop detected");
                    history.push_model(serde_json::to_string(&action).unwrap_or_default());
                    history.push_user("THOUGHT LOOP DETECTED: your reasoning has not changed since the last step. Take a different, concrete action.");
                    history.prune_if_needed(step, self.config.context_prune_after_step, self.config.context_prune_keep_turns);
                    previous_thought = Some(action.thought.clone());
                    continue;
                }
            }
            previous_thought = Some(action.thought.clone());

            if action.is_hallucinated() {
                history.push_model(serde_json::to_string(&action).unwrap_or_default());
                history.push_user("You must either call a tool or set status to complete/incomplete/blocked.");
                history.prune_if_needed(step, self.config.context_prune_after_step, self.config.context_prune_keep_turns);
                continue;
            }

            self.emitter
                .emit(job_id, kinds::AGENT_THOUGHT, json!({"phase_id": phase.id, "thought": action.thought}))
                .await;

            if let Some(status) = action.status {
                if status == AgentStatus::Complete {
                    let (passed, tail) = self.run_verification_gate(phase, ctx, target_dir).await;
                    if passed {
                        self.emitter
                            .emit(job_id, kinds::PHASE_COMPLETED, json!({"phase_id": phase.id, "title": phase.title}))
                            .await;
                        return Ok(());
                    }
                    push_lesson(&mut lessons, format!("verification failed: {}", truncate_tail(&tail, 400)));
                    history.push_model(serde_json::to_string(&action).unwrap_or_default());
                    history.push_user(format!("Verification failed, phase is not complete:\n{tail}"));
                    history.prune_if_needed(step, self.config.context_prune_after_step, self.config.context_prune_keep_turns);
                    continue;
                }

                // incomplete / blocked: the agent is surrendering.
                self.emitter
                    .emit(job_id, kinds::PHASE_ERROR, json!({"phase_id": phase.id, "reason": action.thought, "status": status}))
                    .await;
                return Err(KandraError::AgentGaveUp { phase: phase.title.clone(), reason: action.thought });
            }

            // Tool branch.
            let tool = action.tool.expect("non-hallucinated, non-status action carries a tool");
            let args = action.args.clone().unwrap_or_default();

            self.set_activity(job_id, tracker, Activity::ExecutingTool, json!({"tool": tool.to_string(), "args": args})).await;
            let result = self.dispatch_tool(target_dir, ctx, tool, &args).await;
            tracker.record_success(format!("step {step}: ran {tool}")).await;

            action_history.record(tool, &args);

            if tool == ToolName::RunCommand {
                let command = args.command.clone().unwrap_or_default();
                self.emitter
                    .emit(
                        job_id,
                        kinds::TERMINAL_OUTPUT,
                        json!({"phase_id": phase.id, "command": command, "output": kandra_shell::audit::truncate_output(&tool_output_text(&result))}),
                    )
                    .await;

                if result.is_success() {
                    last_failed_command = None;
                    consecutive_failures = 0;
                } else if last_failed_command.as_deref() == Some(command.as_str()) {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.config.grounding_after_consecutive_failures {
                        self.inject_grounded_suggestion(job_id, &mut history, &command, &result, ctx).await;
                        consecutive_failures = 0;
                    }
                } else {
                    last_failed_command = Some(command);
                    consecutive_failures = 1;
                }
            } else if tool == ToolName::WriteFile {
                let path = args.path.clone().unwrap_or_default();
                let content = args.content.clone().unwrap_or_default();
                self.emitter
                    .emit(
                        job_id,
                        kinds::FILE_MODIFIED,
                        json!({"phase_id": phase.id, "path": path, "content": kandra_shell::audit::truncate_output(&content)}),
                    )
                    .await;
            }

            if !result.is_success() {
                if let Some(msg) = &result.error {
                    push_lesson(&mut lessons, truncate_tail(msg, 400));
                }
            }

            history.push_model(serde_json::to_string(&action).unwrap_or_default());
            history.push_user(truncate_tail(&tool_observation_text(&result), self.config.history_truncate_chars));
            history.prune_if_needed(step, self.config.context_prune_after_step, self.config.context_prune_keep_turns);
        }

        self.emitter
            .emit(job_id, kinds::PHASE_ERROR, json!({"phase_id": phase.id, "reason": "max steps exceeded"}))
            .await;
        Err(KandraError::MaxStepsExceeded { phase: phase.title.clone(), max: self.config.max_steps })
    }

    async fn dispatch_tool(&self, target_dir: &Path, ctx: &StackContext, tool: ToolName, args: &ToolArgs) -> ToolResult {
        match tool {
            ToolName::ListDir => {
                let path = args.path.as_deref().unwrap_or(".");
                let max_depth = args.max_depth.unwrap_or(2);
                kandra_tools::list_dir(target_dir, path, max_depth).await
            }
            ToolName::ReadFile => {
                let Some(path) = args.path.as_deref() else {
                    return ToolResult::err("read_file requires a path");
                };
                kandra_tools::read_file(target_dir, path).await
            }
            ToolName::WriteFile => {
                let (Some(path), Some(content)) = (args.path.as_deref(), args.content.as_deref()) else {
                    return ToolResult::err("write_file requires path and content");
                };
                kandra_tools::write_file(target_dir, path, content, &ctx.whitelist).await
            }
            ToolName::RunCommand => {
                let Some(command) = args.command.as_deref() else {
                    return ToolResult::err("run_command requires a command");
                };
                let rewritten = self.rewrite(command, ctx, target_dir);
                kandra_shell::run_command(target_dir, &rewritten, args.timeout, &ctx.whitelist).await
            }
        }
    }

    /// Update the watchdog's activity state and emit `activity_update` so
    /// a live dashboard sees real-time progress independent of the
    /// advisory `stuck_warning` the watchdog only fires once a threshold
    /// is crossed.
    async fn set_activity(&self, job_id: JobId, tracker: &Arc<ActivityTracker>, activity: Activity, details: serde_json::Value) {
        tracker.set(activity, details.clone()).await;
        self.emitter
            .emit(job_id, kinds::ACTIVITY_UPDATE, json!({"activity": activity.as_str(), "details": details}))
            .await;
    }

    fn rewrite(&self, command: &str, ctx: &StackContext, target_dir: &Path) -> String {
        let target_has = |name: &str| target_dir.join(name).exists();
        wrappers::rewrite_command(command, ctx.family, &target_has)
    }

    /// Run the phase's declared `verification.test_commands` if present,
    /// else fall back to the heuristic gate when the phase title implies
    /// testing. Returns `(passed, tail_of_output_for_the_failing_command)`.
    async fn run_verification_gate(&self, phase: &Phase, ctx: &StackContext, target_dir: &Path) -> (bool, String) {
        if !phase.verification.test_commands.is_empty() {
            for cmd in &phase.verification.test_commands {
                let rewritten = self.rewrite(cmd, ctx, target_dir);
                let result = kandra_shell::run_command(target_dir, &rewritten, None, &ctx.whitelist).await;
                let combined = tool_output_text(&result);
                if !result.is_success() || test_gate::output_indicates_failure(&combined) {
                    return (false, truncate_tail(&combined, 800));
                }
            }
            return (true, String::new());
        }

        if !phase.implies_verification() {
            return (true, String::new());
        }

        let Some(cmd) = test_gate::choose_test_command(ctx.test_framework.as_deref(), &ctx.package_manager, &ctx.target_stack) else {
            return (true, String::new());
        };
        let rewritten = self.rewrite(&cmd, ctx, target_dir);
        let result = kandra_shell::run_command(target_dir, &rewritten, None, &ctx.whitelist).await;
        let combined = tool_output_text(&result);
        if !result.is_success() || test_gate::output_indicates_failure(&combined) {
            (false, truncate_tail(&combined, 800))
        } else {
            (true, String::new())
        }
    }

    async fn inject_grounded_suggestion(&self, job_id: JobId, history: &mut TurnHistory, command: &str, result: &ToolResult, ctx: &StackContext) {
        let error_text = result.error.clone().unwrap_or_default();
        let prompt = format!(
            "The command `{command}` failed twice in a row while migrating to {}.\nPackage manager: {}.\nError:\n{}",
            ctx.target_stack, ctx.package_manager, error_text
        );
        match self.llm.generate_grounded(&prompt).await {
            Ok(grounded) => {
                let sources: Vec<&String> = grounded.sources.iter().take(3).collect();
                let sources_text = if sources.is_empty() {
                    String::new()
                } else {
                    format!("\nSources:\n{}", sources.iter().map(|s| format!("- {s}")).collect::<Vec<_>>().join("\n"))
                };
                history.push_user(format!("SOLUTION SUGGESTION (from web search): {}{sources_text}", grounded.text));
            }
            Err(e) => {
                warn!(%job_id, error = %e, "grounded fallback unavailable, continuing without it");
            }
        }
    }
}

/// A role-less alternating turn check helper used only in tests below;
/// production code always goes through [`TurnHistory`].
#[cfg(test)]
fn last_role(turns: &[crate::llm::PromptTurn]) -> Option<crate::llm::Role> {
    turns.last().map(|t| t.role)
}

fn tool_output_text(result: &ToolResult) -> String {
    if result.is_success() {
        result.output.clone()
    } else {
        let mut text = result.output.clone();
        if let Some(err) = &result.error {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(err);
        }
        text
    }
}

fn tool_observation_text(result: &ToolResult) -> String {
    if result.is_success() {
        format!("OBSERVATION (success):\n{}", result.output)
    } else {
        format!("OBSERVATION (error):\n{}", result.error.clone().unwrap_or_default())
    }
}

fn reflection_digest(lessons: &[String], baseline_failure: &str) -> String {
    if lessons.is_empty() && baseline_failure.is_empty() {
        return String::new();
    }
    let mut parts = Vec::new();
    if !baseline_failure.is_empty() {
        parts.push(baseline_failure.to_string());
    }
    parts.extend(lessons.iter().cloned());
    parts.join("\n")
}

/// Keep at most the last three *unique* lessons, most recent last.
fn push_lesson(lessons: &mut Vec<String>, lesson: String) {
    lessons.retain(|l| l != &lesson);
    lessons.push(lesson);
    if lessons.len() > 3 {
        lessons.remove(0);
    }
}

fn truncate_tail(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let skip = text.chars().count() - max_chars;
    let tail: String = text.chars().skip(skip).collect();
    format!("... [truncated] ...\n{tail}")
}
