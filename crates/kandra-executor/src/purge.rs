use kandra_tools::language_lock::{is_ignored_dir, is_locked_violation};
use std::path::Path;

/// Walk `target/` deleting files whose extension is "known code" but not
/// in `whitelist`. Runs once at the start of every phase so the agent
/// never starts work in a directory still polluted with files from a
/// previous run or a stray legacy artifact. Returns the relative paths of
/// everything removed.
pub async fn purge_pollution(target_dir: &Path, whitelist: &[String]) -> Vec<String> {
    let mut purged = Vec::new();
    walk_and_purge(target_dir, target_dir, whitelist, &mut purged).await;
    purged
}

fn walk_and_purge<'a>(
    root: &'a Path,
    dir: &'a Path,
    whitelist: &'a [String],
    purged: &'a mut Vec<String>,
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
                walk_and_purge(root, &entry.path(), whitelist, purged).await;
            } else if is_locked_violation(&name, whitelist) {
                let path = entry.path();
                if tokio::fs::remove_file(&path).await.is_ok() {
                    let rel = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().into_owned();
                    purged.push(rel);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn purges_foreign_code_files_not_in_whitelist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), "").unwrap();
        std::fs::write(dir.path().join("legacy.js"), "").unwrap();

        let whitelist = vec![".py".to_string()];
        let purged = purge_pollution(dir.path(), &whitelist).await;

        assert_eq!(purged, vec!["legacy.js".to_string()]);
        assert!(dir.path().join("app.py").exists());
        assert!(!dir.path().join("legacy.js").exists());
    }

    #[tokio::test]
    async fn ignored_directories_are_never_descended_into() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/vendored.py"), "").unwrap();

        let purged = purge_pollution(dir.path(), &[".ts".to_string()]).await;
        assert!(purged.is_empty());
        assert!(dir.path().join("node_modules/vendored.py").exists());
    }

    #[tokio::test]
    async fn meta_files_survive_any_whitelist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        let purged = purge_pollution(dir.path(), &[".py".to_string()]).await;
        assert!(purged.is_empty());
        assert!(dir.path().join("package.json").exists());
    }
}
