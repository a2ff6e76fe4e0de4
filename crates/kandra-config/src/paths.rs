use std::path::PathBuf;

/// XDG app name used to resolve the config directory.
pub const APP_NAME: &str = "kandra";

/// Resolve the directory `kandra.toml` is read from, if the platform
/// exposes a conventional config directory at all. Returns `None` on
/// platforms without one (e.g. no `$HOME`); callers fall back to defaults.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("kandra.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_under_config_dir() {
        if let (Some(dir), Some(file)) = (config_dir(), config_file()) {
            assert!(file.starts_with(dir));
        }
    }
}
