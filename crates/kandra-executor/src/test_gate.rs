use crate::wrappers::{StackFamily, detect_stack_family};

const FAILURE_INDICATORS: &[&str] = &["FAILURES", "FAILED (", "Tests failed", "Test failed", "Error:", "✗", "✖"];
const FAILURE_EXEMPTION: &str = "0 failures";

/// Whether `combined_output` indicates a test failure, per the rule shared
/// by the completion branch's verification check and the heuristic gate:
/// a failure indicator is present and not neutralized by the `0 failures`
/// exemption substring.
pub fn output_indicates_failure(combined_output: &str) -> bool {
    if combined_output.contains(FAILURE_EXEMPTION) {
        return false;
    }
    FAILURE_INDICATORS.iter().any(|marker| combined_output.contains(marker))
}

/// Pick the command to run for the advisory baseline/completion test gate,
/// by precedence: (1) the plan's declared `test_framework`, (2) inferred
/// from the target stack family, (3) `None` if nothing is identifiable —
/// the gate is advisory, not a hard requirement, so "can't tell" means
/// "skip with success" rather than an error.
pub fn choose_test_command(test_framework: Option<&str>, package_manager: &str, target_stack: &str) -> Option<String> {
    if let Some(framework) = test_framework {
        if let Some(cmd) = canonical_for_framework(framework, package_manager) {
            return Some(cmd);
        }
    }
    match detect_stack_family(target_stack) {
        StackFamily::Python => Some("./.venv/bin/pytest".to_string()),
        StackFamily::RustGo if target_stack.to_lowercase().contains("go") => Some("go test ./...".to_string()),
        StackFamily::RustGo => Some("cargo test".to_string()),
        _ => None,
    }
}

fn canonical_for_framework(framework: &str, package_manager: &str) -> Option<String> {
    let lower = framework.to_lowercase();
    match lower.as_str() {
        "pytest" => Some("./.venv/bin/pytest".to_string()),
        "unittest" => Some("./.venv/bin/python -m unittest discover tests".to_string()),
        "jest" | "vitest" | "mocha" | "tap" => Some(format!("{package_manager} test")),
        "go test" => Some("go test ./...".to_string()),
        "cargo test" => Some("cargo test".to_string()),
        _ => None,
    }
}
