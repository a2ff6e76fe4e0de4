use crate::language_lock::is_locked_violation;
use crate::result::ToolResult;
use crate::sandbox::{contains_source_leak, resolve_in_sandbox};
use std::path::Path;

/// Write `content` to `path` under `root`. Checks run in order:
/// source-leak (blocking), sandbox escape (blocking), language-lock
/// (warning only — the file is still written).
pub async fn write_file(root: &Path, path: &str, content: &str, whitelist: &[String]) -> ToolResult {
    if contains_source_leak(content) {
        return ToolResult::err(
            "Permission Denied: content references the read-only source tree (../source). \
             Rewrite the logic locally instead of referencing the legacy code path."
                .to_string(),
        );
    }

    let resolved = match resolve_in_sandbox(root, path) {
        Ok(p) => p,
        Err(e) => {
            return ToolResult::err(format!(
                "Permission Denied: can only write into the target directory ({e})"
            ));
        }
    };

    if let Some(parent) = resolved.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return ToolResult::err(format!("failed to create directories for {path}: {e}"));
        }
    }

    if let Err(e) = tokio::fs::write(&resolved, content.as_bytes()).await {
        return ToolResult::err(format!("failed to write {path}: {e}"));
    }

    let filename = resolved.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let mut result = ToolResult::ok(format!("Wrote {} bytes to {path}", content.len()));
    if !whitelist.is_empty() && is_locked_violation(&filename, whitelist) {
        result = result
            .with_metadata("lock_warning", true)
            .with_metadata("file", filename.clone());
        result.output = format!(
            "{}\n[language-lock warning] '{path}' is outside the allowed extensions {whitelist:?}; written anyway.",
            result.output
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_file_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_file(dir.path(), "src/nested/app.ts", "export {}", &[]).await;
        assert!(result.is_success());
        assert_eq!(tokio::fs::read_to_string(dir.path().join("src/nested/app.ts")).await.unwrap(), "export {}");
    }

    #[tokio::test]
    async fn source_leak_in_content_is_blocked_and_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_file(dir.path(), "app.py", "from ../source/util import x", &[]).await;
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("Permission Denied"));
        assert!(!dir.path().join("app.py").exists());
    }

    #[tokio::test]
    async fn sandbox_escape_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_file(dir.path(), "../outside.txt", "x", &[]).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn language_lock_violation_warns_but_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let whitelist = vec![".ts".to_string()];
        let result = write_file(dir.path(), "legacy.py", "print(1)", &whitelist).await;
        assert!(result.is_success());
        assert_eq!(result.metadata.get("lock_warning").unwrap(), true);
        assert!(dir.path().join("legacy.py").exists());
    }

    #[tokio::test]
    async fn whitelisted_extension_has_no_warning() {
        let dir = tempfile::tempdir().unwrap();
        let whitelist = vec![".ts".to_string()];
        let result = write_file(dir.path(), "app.ts", "export {}", &whitelist).await;
        assert!(result.metadata.get("lock_warning").is_none());
    }
}
