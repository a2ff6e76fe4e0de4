//! The literal pattern lists the scenario-aware shell tests output lines
//! and command text against. Pinned verbatim rather than paraphrased so
//! behavior stays byte-for-byte faithful to the reference shell tool.

/// Case-insensitive substrings that mark a long-running process as ready
/// (e.g. a dev server that has finished booting).
pub const READY_PATTERNS: &[&str] = &[
    "listening on port",
    "started successfully",
    "ready in",
    "server started",
    "compiled successfully",
    "database connected",
    "connected to",
    "application started",
    "http://localhost",
];

/// Case-insensitive substrings that mark a process as blocked on
/// interactive input it will never receive.
pub const INTERACTIVE_PATTERNS: &[&str] =
    &["(y/n)?", "[y/n]", "continue?", "password:", "enter name:", "confirm?"];

/// Substrings in the command text that raise the timeout floor to
/// [`crate::scenario::HEAVY_TIMEOUT_SECS`].
pub const HEAVY_KEYWORDS: &[&str] =
    &["install", "build", "compile", "setup", "update", "migration", "pytest", "npm test"];

/// Substrings that mark a command as "complex" — it embeds its own
/// verification (a pipeline, background job, or network probe) and should
/// be allowed to exit naturally even after the ready signal fires.
pub const COMPLEX_MARKERS: &[&str] = &["&", "&&", ";", "|", "curl", "wget"];

pub fn matches_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(&n.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_pattern_matches_case_insensitively() {
        assert!(matches_any("Listening on port 9001", READY_PATTERNS));
        assert!(matches_any("LISTENING ON PORT 9001", READY_PATTERNS));
    }

    #[test]
    fn interactive_pattern_detects_confirmation_prompt() {
        assert!(matches_any("Continue? (y/n)", INTERACTIVE_PATTERNS));
    }

    #[test]
    fn heavy_keyword_detects_install() {
        assert!(matches_any("npm install express", HEAVY_KEYWORDS));
    }

    #[test]
    fn complex_marker_detects_pipe() {
        assert!(matches_any("cat a | grep b", COMPLEX_MARKERS));
    }

    #[test]
    fn plain_command_is_not_complex() {
        assert!(!matches_any("npm run dev", COMPLEX_MARKERS));
    }
}
