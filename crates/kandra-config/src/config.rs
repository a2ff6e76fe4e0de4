use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Orchestrator-wide tunables. Every field has a built-in default so a
/// missing config file is never an error — only a malformed one is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KandraConfig {
    pub workspace_base_path: String,
    pub max_steps: u32,
    pub shell_default_timeout_secs: u64,
    pub shell_heavy_timeout_secs: u64,
    pub thought_similarity_threshold: f64,
    pub watchdog_poll_interval_secs: u64,
    pub watchdog_stuck_threshold_secs: u64,
    pub history_truncate_chars: usize,
    pub context_prune_after_step: usize,
    pub context_prune_keep_turns: usize,
    pub grounding_after_consecutive_failures: u32,
}

impl Default for KandraConfig {
    fn default() -> Self {
        Self {
            workspace_base_path: "./workspaces".to_string(),
            max_steps: 50,
            shell_default_timeout_secs: 60,
            shell_heavy_timeout_secs: 300,
            thought_similarity_threshold: 0.85,
            watchdog_poll_interval_secs: 30,
            watchdog_stuck_threshold_secs: 120,
            history_truncate_chars: 2000,
            context_prune_after_step: 40,
            context_prune_keep_turns: 30,
            grounding_after_consecutive_failures: 2,
        }
    }
}

impl KandraConfig {
    /// Load from `path` if it exists; otherwise return defaults. A present
    /// but malformed file is an error (the one case where we do not fall
    /// back silently, since that would mask a typo the user should fix).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Resolve the conventional config file location and load it, falling
    /// back to defaults when no platform config dir is available at all.
    pub fn load_default() -> Result<Self> {
        match crate::paths::config_file() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = KandraConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.max_steps, 50);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kandra.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "max_steps = 10").unwrap();
        let cfg = KandraConfig::load(&path).unwrap();
        assert_eq!(cfg.max_steps, 10);
        assert_eq!(cfg.watchdog_stuck_threshold_secs, 120);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kandra.toml");
        std::fs::write(&path, "not = [valid toml").unwrap();
        assert!(KandraConfig::load(&path).is_err());
    }
}
