use kandra_core::{ToolArgs, ToolName};

/// `(tool, canonicalized args)` history the executor keeps per phase to
/// catch the agent repeating itself verbatim.
#[derive(Debug, Default)]
pub struct ActionHistory {
    entries: Vec<(ToolName, String)>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tool: ToolName, args: &ToolArgs) {
        self.entries.push((tool, args.canonical()));
    }

    /// True once the last three recorded calls are identical tool+args.
    pub fn is_looping(&self) -> bool {
        if self.entries.len() < 3 {
            return false;
        }
        let last_three = &self.entries[self.entries.len() - 3..];
        last_three.windows(2).all(|w| w[0] == w[1])
    }

    pub fn warning(&self) -> Option<String> {
        if !self.is_looping() {
            return None;
        }
        let (tool, _) = self.entries.last().unwrap();
        Some(format!(
            "TOOL LOOP DETECTED: You have attempted {tool} 3 times with identical parameters. You MUST change your strategy."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: &str) -> ToolArgs {
        ToolArgs { command: Some(command.to_string()), ..Default::default() }
    }

    #[test]
    fn three_identical_calls_trigger_the_warning() {
        let mut history = ActionHistory::new();
        for _ in 0..3 {
            history.record(ToolName::RunCommand, &args("npm test"));
        }
        assert!(history.is_looping());
        assert!(history.warning().unwrap().contains("TOOL LOOP DETECTED"));
    }

    #[test]
    fn two_identical_calls_do_not_trigger() {
        let mut history = ActionHistory::new();
        history.record(ToolName::RunCommand, &args("npm test"));
        history.record(ToolName::RunCommand, &args("npm test"));
        assert!(!history.is_looping());
    }

    #[test]
    fn varying_args_resets_the_streak() {
        let mut history = ActionHistory::new();
        history.record(ToolName::RunCommand, &args("npm test"));
        history.record(ToolName::RunCommand, &args("npm install"));
        history.record(ToolName::RunCommand, &args("npm test"));
        assert!(!history.is_looping());
    }

    #[test]
    fn key_order_in_args_does_not_defeat_detection() {
        let mut history = ActionHistory::new();
        let a = ToolArgs { command: Some("x".into()), timeout: Some(5.0), ..Default::default() };
        let b = ToolArgs { timeout: Some(5.0), command: Some("x".into()), ..Default::default() };
        history.record(ToolName::RunCommand, &a);
        history.record(ToolName::RunCommand, &b);
        history.record(ToolName::RunCommand, &a);
        assert!(history.is_looping());
    }
}
