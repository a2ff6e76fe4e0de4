use async_trait::async_trait;
use kandra_core::{AgentAction, Result};

/// One turn in the alternating conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A grounded (web-search-backed) response used for the "second same
/// command failure" fallback. `sources` is capped by the caller to three
/// URIs before being injected into the observation.
#[derive(Debug, Clone)]
pub struct GroundedResponse {
    pub text: String,
    pub sources: Vec<String>,
}

/// Contract for the external model the Executor drives. Concrete
/// providers (the actual LLM API call) are outside this crate's scope —
/// the orchestration core only needs something that satisfies this trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Request the next [`AgentAction`] for a ReAct step. `system_instruction`
    /// is the fixed executor system prompt; `turns` is the alternating
    /// user/model history ending in the current user turn.
    async fn generate(&self, system_instruction: &str, turns: &[PromptTurn]) -> Result<AgentAction>;

    /// Ask for help on a failing command, backed by web search/grounding.
    /// Returns `Err` if the capability is unavailable or times out; callers
    /// treat that as "no suggestion available", not a fatal error.
    async fn generate_grounded(&self, prompt: &str) -> Result<GroundedResponse>;
}

/// The narrower capability the spec actually calls opaque: "given a prompt
/// and optional output schema, returns text". Most real providers are
/// naturally shaped like this rather than like [`LlmClient`] directly —
/// they hand back raw completion text, which may or may not be clean JSON.
#[async_trait]
pub trait RawCompletion: Send + Sync {
    async fn complete(&self, system_instruction: &str, turns: &[PromptTurn]) -> Result<String>;
    async fn complete_grounded(&self, prompt: &str) -> Result<GroundedResponse>;
}

/// Adapts any [`RawCompletion`] provider into an [`LlmClient`] by running
/// its text output through [`crate::action::parse_action`], which tolerates
/// prose wrapping and fenced code blocks around the JSON object.
pub struct TextCompletionClient<T>(pub T);

#[async_trait]
impl<T: RawCompletion> LlmClient for TextCompletionClient<T> {
    async fn generate(&self, system_instruction: &str, turns: &[PromptTurn]) -> Result<AgentAction> {
        let raw = self.0.complete(system_instruction, turns).await?;
        crate::action::parse_action(&raw)
    }

    async fn generate_grounded(&self, prompt: &str) -> Result<GroundedResponse> {
        self.0.complete_grounded(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRaw(&'static str);

    #[async_trait]
    impl RawCompletion for FakeRaw {
        async fn complete(&self, _system_instruction: &str, _turns: &[PromptTurn]) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn complete_grounded(&self, _prompt: &str) -> Result<GroundedResponse> {
            Ok(GroundedResponse { text: "try reinstalling".to_string(), sources: vec!["https://example.com".to_string()] })
        }
    }

    #[tokio::test]
    async fn adapter_parses_prose_wrapped_json_from_the_raw_provider() {
        let client = TextCompletionClient(FakeRaw(
            "Sure, here goes:\n```json\n{\"thought\":\"looking\",\"tool\":\"list_dir\"}\n```",
        ));
        let action = client.generate("system", &[]).await.unwrap();
        assert_eq!(action.thought, "looking");
    }

    #[tokio::test]
    async fn adapter_forwards_grounded_calls_unchanged() {
        let client = TextCompletionClient(FakeRaw(""));
        let grounded = client.generate_grounded("pip install foo failed").await.unwrap();
        assert!(grounded.text.contains("reinstalling"));
        assert_eq!(grounded.sources.len(), 1);
    }
}
