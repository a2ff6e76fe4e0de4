use serde::{Deserialize, Serialize};

/// The migration plan produced by the (external) planner and carried as the
/// payload of the `plan_complete` event. Unrecognized fields are tolerated:
/// this type never derives `deny_unknown_fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    #[serde(default)]
    pub summary: PlanSummary,
    pub transformation: Transformation,
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub dependencies: Dependencies,
}

impl MigrationPlan {
    /// At least one phase is a hard invariant; a planner that emits an
    /// empty phase list has produced an unusable plan.
    pub fn validate(&self) -> Result<(), String> {
        if self.phases.is_empty() {
            return Err("plan has no phases".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub confidence: Option<i32>,
    #[serde(default)]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformation {
    pub source_stack: String,
    pub target_stack: String,
    #[serde(default)]
    pub package_manager: Option<String>,
    #[serde(default)]
    pub test_framework: Option<String>,
    #[serde(default)]
    pub build_tool: Option<String>,
    #[serde(default)]
    pub file_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub files_impacted: Vec<FileImpact>,
    #[serde(default)]
    pub verification: Verification,
}

impl Phase {
    /// Whether this phase's title implies a test/verification gate should
    /// run before or at completion, e.g. "Run test suite" or "QA pass".
    pub fn implies_verification(&self) -> bool {
        let lower = self.title.to_lowercase();
        lower.contains("test") || lower.contains("verify") || lower.contains("qa")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileImpact {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub test_commands: Vec<String>,
    #[serde(default)]
    pub success_criteria: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub add: Vec<DependencyChange>,
    #[serde(default)]
    pub remove: Vec<DependencyChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyChange {
    pub name: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> MigrationPlan {
        serde_json::from_value(serde_json::json!({
            "transformation": {
                "source_stack": "Express + JS",
                "target_stack": "Fastify + TypeScript",
                "file_extensions": [".ts", ".tsx"]
            },
            "phases": [
                {
                    "id": 1,
                    "title": "Scaffold and verify",
                    "verification": { "test_commands": ["npm test"] }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn tolerates_unknown_top_level_fields() {
        let json = serde_json::json!({
            "transformation": { "source_stack": "a", "target_stack": "b" },
            "phases": [{ "id": 1, "title": "x" }],
            "totally_unknown_field": { "nested": true }
        });
        let plan: MigrationPlan = serde_json::from_value(json).unwrap();
        assert_eq!(plan.phases.len(), 1);
    }

    #[test]
    fn validate_rejects_empty_phase_list() {
        let mut plan = sample_plan();
        plan.phases.clear();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn phase_title_implies_verification_case_insensitively() {
        let plan = sample_plan();
        assert!(plan.phases[0].implies_verification());
    }
}
