//! The Executor Agent: the ReAct (reason-act-observe) loop that drives a
//! migration plan to completion against a sandboxed workspace through the
//! fixed [`kandra_tools`]/[`kandra_shell`] tool surface.
//!
//! [`executor::Executor`] is the entry point (`execute_plan`); everything
//! else in this crate is a focused piece of its machinery: prompt
//! construction, turn history, loop/thought-loop detection, the heuristic
//! test gate, smart command wrappers, venv bootstrap, and the advisory
//! watchdog.

pub mod action;
pub mod executor;
pub mod history;
pub mod llm;
pub mod loop_detect;
pub mod prompt;
pub mod purge;
pub mod similarity;
pub mod test_gate;
pub mod venv;
pub mod watchdog;
pub mod wrappers;

pub use executor::Executor;
pub use llm::{GroundedResponse, LlmClient, PromptTurn, RawCompletion, Role, TextCompletionClient};
