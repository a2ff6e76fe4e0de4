use crate::result::ToolResult;
use crate::sandbox::resolve_in_sandbox;
use std::path::Path;

/// Walk the tree rooted at `path` (resolved under `root`), returning an
/// indented listing. Dotfiles are skipped; recursion stops past
/// `max_depth`.
pub async fn list_dir(root: &Path, path: &str, max_depth: u32) -> ToolResult {
    let resolved = match resolve_in_sandbox(root, path) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e.to_string()),
    };
    if !resolved.exists() {
        return ToolResult::err(format!("path not found: {path}"));
    }

    let mut lines = Vec::new();
    if let Err(e) = walk(&resolved, 0, max_depth, &mut lines).await {
        return ToolResult::err(format!("failed to list directory: {e}"));
    }
    ToolResult::ok(lines.join("\n"))
}

async fn walk(dir: &Path, depth: u32, max_depth: u32, lines: &mut Vec<String>) -> std::io::Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        children.push((name, entry.path(), entry.file_type().await?.is_dir()));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));

    let indent = "  ".repeat(depth as usize);
    for (name, path, is_dir) in children {
        if is_dir {
            lines.push(format!("{indent}{name}/"));
            if depth < max_depth {
                Box::pin(walk(&path, depth + 1, max_depth, lines)).await?;
            }
        } else {
            lines.push(format!("{indent}{name}"));
        }
    }
    Ok(())
}
