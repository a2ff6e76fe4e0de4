use kandra_tools::language_lock::{is_ignored_dir, is_locked_violation};
use kandra_tools::sandbox::contains_source_leak;
use std::path::Path;

const TRUNCATE_THRESHOLD: usize = 2048;
const TRUNCATE_HEAD: usize = 1024;
const TRUNCATE_TAIL: usize = 1024;

/// Truncate text over 2 KiB to head-1 KiB + tail-1 KiB with an ellipsis
/// marker, preserving enough context from both ends for the agent to
/// reason about what happened without blowing up the prompt.
pub fn truncate_output(text: &str) -> String {
    if text.len() <= TRUNCATE_THRESHOLD {
        return text.to_string();
    }
    let head = take_chars_from_start(text, TRUNCATE_HEAD);
    let tail = take_chars_from_end(text, TRUNCATE_TAIL);
    format!("{head}\n... [truncated {} bytes] ...\n{tail}", text.len() - head.len() - tail.len())
}

fn take_chars_from_start(text: &str, max_bytes: usize) -> String {
    let mut end = max_bytes.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

fn take_chars_from_end(text: &str, max_bytes: usize) -> String {
    let start = text.len().saturating_sub(max_bytes);
    let mut start = start;
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

pub fn combined_output_leaks_source(stdout: &str, stderr: &str) -> bool {
    contains_source_leak(stdout) || contains_source_leak(stderr)
}

/// Walk `root` looking for files that violate `whitelist`, skipping the
/// shared ignore-directory list. Returns the list of offending relative
/// paths; an empty list means no violation was found.
pub async fn find_lock_violations(root: &Path, whitelist: &[String]) -> Vec<String> {
    if whitelist.is_empty() {
        return Vec::new();
    }
    let mut violations = Vec::new();
    walk(root, root, whitelist, &mut violations).await;
    violations
}

fn walk<'a>(
    root: &'a Path,
    dir: &'a Path,
    whitelist: &'a [String],
    violations: &'a mut Vec<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'a>> {
    Box::pin(async move {
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                if is_ignored_dir(&name) {
                    continue;
                }
                walk(root, &entry.path(), whitelist, violations).await;
            } else if is_locked_violation(&name, whitelist) {
                let rel = entry.path().strip_prefix(root).unwrap_or(&entry.path()).to_string_lossy().into_owned();
                violations.push(rel);
            }
        }
    })
}
