use async_trait::async_trait;
use kandra_core::{AgentAction, KandraError, Result};
use kandra_executor::{GroundedResponse, LlmClient, PromptTurn};
use std::path::Path;
use std::sync::Mutex;

/// Fixture shape for a recorded ReAct trace: the ordered actions a real
/// model would have produced for one phase, plus a canned grounded
/// fallback. This is how `kandra job approve` drives the Executor without
/// a live model binding — the actual LLM call is an external capability
/// this crate family never implements (see [`kandra_executor::llm`]); a
/// production deployment swaps this struct for a [`RawCompletion`]
/// adapter over whatever provider it uses.
///
/// [`RawCompletion`]: kandra_executor::RawCompletion
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ScriptedTrace {
    #[serde(default)]
    pub actions: Vec<AgentAction>,
    #[serde(default)]
    pub grounded_text: Option<String>,
    #[serde(default)]
    pub grounded_sources: Vec<String>,
}

impl ScriptedTrace {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Replays a fixed, pre-recorded sequence of [`AgentAction`]s in order,
/// one per `generate` call. Once exhausted every further call fails,
/// which the Executor's step loop surfaces as an unparsable-response
/// retry — exactly as it would for a live provider that stopped
/// responding usefully.
pub struct ScriptedLlm {
    remaining: Mutex<Vec<AgentAction>>,
    grounded: GroundedResponse,
}

impl ScriptedLlm {
    pub fn new(trace: ScriptedTrace) -> Self {
        let mut actions = trace.actions;
        actions.reverse();
        Self {
            remaining: Mutex::new(actions),
            grounded: GroundedResponse {
                text: trace.grounded_text.unwrap_or_else(|| "no grounded suggestion recorded for this trace".to_string()),
                sources: trace.grounded_sources,
            },
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, _system_instruction: &str, _turns: &[PromptTurn]) -> Result<AgentAction> {
        self.remaining
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| KandraError::LlmError("scripted trace exhausted: no more recorded actions".to_string()))
    }

    async fn generate_grounded(&self, _prompt: &str) -> Result<GroundedResponse> {
        Ok(self.grounded.clone())
    }
}
