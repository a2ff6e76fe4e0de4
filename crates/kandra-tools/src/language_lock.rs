//! The extension/filename whitelists shared by the write-time notice
//! (here), the shell tool's post-command audit, and the executor's
//! phase-start purge. Kept in one place so the three call sites can never
//! drift apart.

/// Every extension considered "code" for language-lock purposes across
/// the supported target stacks. The foreign-code set purged at phase
/// start is this set minus the plan's whitelist, per the design note that
/// prefers deriving the foreign set over hard-coding it per language.
pub const KNOWN_CODE_EXTENSIONS: &[&str] = &[
    ".js", ".jsx", ".ts", ".tsx", ".py", ".go", ".rs", ".c", ".cpp", ".h", ".java", ".kt", ".rb",
    ".php", ".cs", ".swift", ".sh", ".sql",
];

/// Files and suffixes that are never subject to language-lock, regardless
/// of whitelist: metadata, lockfiles, and well-known build descriptors.
pub const META_ALLOW: &[&str] = &[
    ".json", ".md", ".yml", ".yaml", ".txt", ".gitignore", ".env", ".lock", "license",
    ".editorconfig", "tsconfig.json", "package.json", "jest.config.js", "next.config.js",
    "tailwind.config.js", "postcss.config.js", "vite.config.js", "babel.config.js",
    "webpack.config.js", "pom.xml", "web.xml", "build.gradle", "settings.gradle", "mvnw",
    "gradlew", "composer.json", "composer.lock", "gemfile", "gemfile.lock", "cargo.toml",
    "cargo.lock", "go.mod", "go.sum", "dockerfile", "docker-compose.yml",
];

/// Directories never walked by the post-command audit or the phase-start
/// purge: build output, caches, and vendored dependencies.
pub const IGNORE_DIRS: &[&str] = &[
    "node_modules", ".git", "__pycache__", ".venv", "dist", "build", "coverage", ".next",
    ".turbo", "out", ".jest_cache", ".pytest_cache", "target", "vendor", ".gradle", ".cache",
];

fn extension_of(filename: &str) -> Option<String> {
    let lower = filename.to_lowercase();
    lower.rfind('.').map(|idx| lower[idx..].to_string())
}

/// `*.config.{js,cjs,mjs}` files are always allowed regardless of
/// whitelist — a common convention across JS toolchains that would
/// otherwise collide with a TypeScript-only whitelist.
fn is_config_suffix(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.ends_with(".config.js") || lower.ends_with(".config.cjs") || lower.ends_with(".config.mjs")
}

fn is_meta_allowed(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    if is_config_suffix(&lower) {
        return true;
    }
    if META_ALLOW.contains(&lower.as_str()) {
        return true;
    }
    match extension_of(&lower) {
        Some(ext) => META_ALLOW.contains(&ext.as_str()),
        None => false,
    }
}

/// Whether `filename` is a code file not covered by `whitelist` and not
/// exempted by the metadata allow-list — i.e. a language-lock violation.
pub fn is_locked_violation(filename: &str, whitelist: &[String]) -> bool {
    let Some(ext) = extension_of(filename) else {
        return false;
    };
    if !KNOWN_CODE_EXTENSIONS.contains(&ext.as_str()) {
        return false;
    }
    if is_meta_allowed(filename) {
        return false;
    }
    !whitelist.iter().any(|w| w.to_lowercase() == ext)
}

/// Whether `dir_name` (a single path component) should halt a tree walk.
pub fn is_ignored_dir(dir_name: &str) -> bool {
    IGNORE_DIRS.contains(&dir_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_file_violates_typescript_only_whitelist() {
        let whitelist = vec![".ts".to_string(), ".tsx".to_string()];
        assert!(is_locked_violation("legacy.py", &whitelist));
    }

    #[test]
    fn typescript_file_does_not_violate_its_own_whitelist() {
        let whitelist = vec![".ts".to_string()];
        assert!(!is_locked_violation("app.ts", &whitelist));
    }

    #[test]
    fn package_json_is_always_allowed() {
        let whitelist = vec![".ts".to_string()];
        assert!(!is_locked_violation("package.json", &whitelist));
    }

    #[test]
    fn webpack_config_js_suffix_is_allowed_under_ts_whitelist() {
        let whitelist = vec![".ts".to_string()];
        assert!(!is_locked_violation("webpack.config.js", &whitelist));
    }

    #[test]
    fn non_code_extension_never_violates() {
        let whitelist = vec![".ts".to_string()];
        assert!(!is_locked_violation("README.rst", &whitelist));
    }

    #[test]
    fn node_modules_is_an_ignored_directory() {
        assert!(is_ignored_dir("node_modules"));
        assert!(!is_ignored_dir("src"));
    }
}
