use crate::llm::{PromptTurn, Role};

/// The append-only turn history for one phase's ReAct loop. Enforces
/// strict user/model alternation — the LLM API this is modeled on rejects
/// two consecutive turns of the same role.
#[derive(Debug, Default)]
pub struct TurnHistory {
    turns: Vec<PromptTurn>,
}

impl TurnHistory {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn push_model(&mut self, content: impl Into<String>) {
        debug_assert!(
            !matches!(self.turns.last(), Some(t) if t.role == Role::Model),
            "two consecutive model turns"
        );
        self.turns.push(PromptTurn { role: Role::Model, content: content.into() });
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        debug_assert!(
            !matches!(self.turns.last(), Some(t) if t.role == Role::User),
            "two consecutive user turns"
        );
        self.turns.push(PromptTurn { role: Role::User, content: content.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// After `context_prune_after_step` steps, keep only the last
    /// `keep` turns, bounding prompt size for long-running phases.
    pub fn prune_if_needed(&mut self, step: usize, prune_after: usize, keep: usize) {
        if step > prune_after && self.turns.len() > keep {
            let start = self.turns.len() - keep;
            self.turns.drain(..start);
        }
    }

    /// Build the message list to send for this step: on turn 1 the
    /// preamble is the sole user turn; afterwards it is merged into the
    /// last user (observation) turn to preserve alternation rather than
    /// appended as a new turn.
    pub fn with_preamble(&self, preamble: &str) -> Vec<PromptTurn> {
        if self.turns.is_empty() {
            return vec![PromptTurn { role: Role::User, content: preamble.to_string() }];
        }

        let mut messages: Vec<PromptTurn> = self.turns[..self.turns.len() - 1].to_vec();
        let last = &self.turns[self.turns.len() - 1];
        if last.role == Role::User {
            messages.push(PromptTurn {
                role: Role::User,
                content: format!("{}\n\n--- CURRENT STATUS ---\n{}", last.content, preamble),
            });
        } else {
            messages.push(last.clone());
            messages.push(PromptTurn { role: Role::User, content: preamble.to_string() });
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_one_is_the_preamble_alone() {
        let history = TurnHistory::new();
        let messages = history.with_preamble("hello");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "hello");
    }

    #[test]
    fn preamble_merges_into_trailing_user_observation() {
        let mut history = TurnHistory::new();
        history.push_user("turn 1 preamble");
        history.push_model(r#"{"thought":"ok"}"#);
        history.push_user("observation: file written");

        let messages = history.with_preamble("next status");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages.last().unwrap().role, Role::User);
        assert!(messages.last().unwrap().content.contains("observation: file written"));
        assert!(messages.last().unwrap().content.contains("next status"));
    }

    #[test]
    #[should_panic]
    fn consecutive_model_turns_panic_in_debug() {
        let mut history = TurnHistory::new();
        history.push_model("a");
        history.push_model("b");
    }

    #[test]
    fn prune_keeps_only_the_most_recent_turns() {
        let mut history = TurnHistory::new();
        for i in 0..50 {
            if i % 2 == 0 {
                history.push_user(format!("u{i}"));
            } else {
                history.push_model(format!("m{i}"));
            }
        }
        history.prune_if_needed(41, 40, 30);
        assert_eq!(history.len(), 30);
    }

    #[test]
    fn prune_is_a_no_op_before_the_threshold() {
        let mut history = TurnHistory::new();
        history.push_user("u0");
        history.prune_if_needed(10, 40, 30);
        assert_eq!(history.len(), 1);
    }
}
