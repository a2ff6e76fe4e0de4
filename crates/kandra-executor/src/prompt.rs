use kandra_core::Phase;

const TOOLS_SCHEMA: &str = r#"[
  {"name": "list_dir", "args": {"path": "string", "max_depth": "integer (optional)"}},
  {"name": "read_file", "args": {"path": "string"}},
  {"name": "write_file", "args": {"path": "string", "content": "string"}},
  {"name": "run_command", "args": {"command": "string", "timeout": "number (optional, seconds)"}}
]"#;

/// Build the per-step context preamble: workspace layout reminder, stack
/// DNA, purge report (only passed on the phase's first step), loop
/// warning, failure reflection, the phase itself, and the tool schema.
#[allow(clippy::too_many_arguments)]
pub fn build_context(
    phase: &Phase,
    target_stack: &str,
    allowed_extensions: &[String],
    purged_files: Option<&[String]>,
    loop_warning: &str,
    failure_reflection: &str,
) -> String {
    let instructions = phase.instructions.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n");
    let tasks = phase.tasks.iter().map(|t| format!("- {t}")).collect::<Vec<_>>().join("\n");

    let affected_files = if phase.files_impacted.is_empty() {
        "(none listed)".to_string()
    } else {
        let mut table = "| Source | Target | Reason |\n|---|---|---|\n".to_string();
        for f in &phase.files_impacted {
            table.push_str(&format!("| {} | {} | {} |\n", f.source, f.target, f.reason));
        }
        table
    };

    let success_criteria = phase.verification.success_criteria.clone().unwrap_or_else(|| "All tasks complete".to_string());
    let test_commands = phase.verification.test_commands.join(", ");

    let purge_context = match purged_files {
        Some(files) if !files.is_empty() => {
            format!("\nAUTONOMOUS PURGE: Kandra automatically cleaned up the following forbidden files at start: {}\n", files.join(", "))
        }
        _ => String::new(),
    };

    let reflection = if failure_reflection.is_empty() { "No previous failures in this phase." } else { failure_reflection };

    format!(
        "WORKSPACE LAYOUT:\n\
         - SOURCE (Legacy): ../source/\n\
         - TARGET (New): ./target/ (Current Working Directory)\n\n\
         STACK DNA (HARD CONSTRAINTS):\n\
         - Target Stack: {target_stack}\n\
         - Allowed Extensions: {extensions}\n\
         - Lock Status: ACTIVE (Tool-level enforcement enabled)\n\
         {purge_context}{loop_warning}\n\
         FAILURE REFLECTION (LEARN FROM THIS):\n\
         {reflection}\n\n\
         CURRENT PHASE: {title}\n\
         DESCRIPTION: {description}\n\n\
         DETAILED INSTRUCTIONS (DO NOT DEVIATE):\n\
         {instructions}\n\n\
         TASKS TO COMPLETE:\n\
         {tasks}\n\n\
         FILES IMPACTED:\n\
         {affected_files}\n\
         PHASE VERIFICATION (MANDATORY SUCCESS):\n\
         - Success Criteria: {success_criteria}\n\
         - Verification Commands: {test_commands}\n\n\
         AVAILABLE TOOLS:\n\
         {TOOLS_SCHEMA}\n\n\
         What is your next action? (Response MUST be JSON)",
        extensions = allowed_extensions.join(", "),
        title = phase.title,
        description = phase.description,
    )
}
