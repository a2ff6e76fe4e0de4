use crate::result::ToolResult;
use crate::sandbox::resolve_in_sandbox;
use std::path::Path;

/// Files above this size are refused rather than read, to keep prompt
/// sizes bounded.
pub const MAX_READ_BYTES: usize = 50_000;

pub async fn read_file(root: &Path, path: &str) -> ToolResult {
    let resolved = match resolve_in_sandbox(root, path) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e.to_string()),
    };

    let bytes = match tokio::fs::read(&resolved).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ToolResult::err(format!("file not found: {path}"));
        }
        Err(e) => return ToolResult::err(format!("failed to read {path}: {e}")),
    };

    if bytes.len() > MAX_READ_BYTES {
        return ToolResult::err(format!(
            "file too large: {path} ({} bytes, limit {MAX_READ_BYTES})",
            bytes.len()
        ));
    }

    match String::from_utf8(bytes) {
        Ok(text) => ToolResult::ok(text),
        Err(_) => ToolResult::err(format!("file is not text (binary): {path}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_text_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let result = read_file(dir.path(), "a.txt").await;
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn missing_file_is_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_file(dir.path(), "nope.txt").await;
        assert!(result.error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let big = vec![b'x'; MAX_READ_BYTES + 1];
        std::fs::write(dir.path().join("big.txt"), &big).unwrap();
        let result = read_file(dir.path(), "big.txt").await;
        assert!(result.error.unwrap().contains("too large"));
    }

    #[tokio::test]
    async fn binary_file_is_rejected_as_not_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.dat"), [0xff, 0xfe, 0x00, 0xff]).unwrap();
        let result = read_file(dir.path(), "bin.dat").await;
        assert!(result.error.unwrap().contains("binary"));
    }

    #[tokio::test]
    async fn escaping_sandbox_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_file(dir.path(), "../source/secret.py").await;
        assert!(!result.is_success());
    }
}
