use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Uniform result shape for every tool. Errors are reported as data here,
/// never as a Rust `Err` from the tool functions — the agent must be able
/// to read and reason about them the same way it reads successful output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
            metadata: Map::new(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: Some(message.into()),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
