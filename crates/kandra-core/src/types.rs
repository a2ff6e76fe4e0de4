use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four side-effect primitives the agent can invoke. A closed set: new
/// capabilities are added as variants here, not by accepting arbitrary tool
/// name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ListDir,
    ReadFile,
    WriteFile,
    RunCommand,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ListDir => "list_dir",
            ToolName::ReadFile => "read_file",
            ToolName::WriteFile => "write_file",
            ToolName::RunCommand => "run_command",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list_dir" => Ok(ToolName::ListDir),
            "read_file" => Ok(ToolName::ReadFile),
            "write_file" => Ok(ToolName::WriteFile),
            "run_command" => Ok(ToolName::RunCommand),
            other => Err(format!("unknown tool: {other}")),
        }
    }
}

/// Terminal signal a step can emit instead of (or in addition to
/// attempting) a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Complete,
    Incomplete,
    Blocked,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::Complete => "complete",
            AgentStatus::Incomplete => "incomplete",
            AgentStatus::Blocked => "blocked",
        };
        write!(f, "{s}")
    }
}

/// Arguments the LLM may populate; unused fields for a given tool are
/// dropped by the dispatcher rather than rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

impl ToolArgs {
    /// Canonical JSON (sorted keys) used as the comparison key for loop
    /// detection. Key order differences between otherwise-identical calls
    /// must not defeat the detector.
    pub fn canonical(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Raw action JSON the LLM returns for a single ReAct step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    pub thought: String,
    #[serde(default)]
    pub tool: Option<ToolName>,
    #[serde(default)]
    pub args: Option<ToolArgs>,
    #[serde(default)]
    pub status: Option<AgentStatus>,
}

impl AgentAction {
    /// Neither a recognized tool nor status present: the model produced
    /// text without committing to an action.
    pub fn is_hallucinated(&self) -> bool {
        self.tool.is_none() && self.status.is_none()
    }
}
