//! Configuration file locations
//!
//! A `flagrun.toml` in the working directory wins over the per-user file.

use std::path::PathBuf;

/// Application name used for platform directories
const APP_NAME: &str = "flagrun";

/// File name of the configuration file
const CONFIG_FILE: &str = "flagrun.toml";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/flagrun/`
/// - macOS: `~/Library/Application Support/flagrun/`
/// - Windows: `%APPDATA%\flagrun\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the per-user configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Path of the project-local configuration file in the working directory
pub fn project_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_config_path_name() {
        let path = project_config_path();
        assert_eq!(path.file_name().unwrap(), CONFIG_FILE);
    }

    #[test]
    fn test_config_path_is_in_config_dir() {
        if let (Some(dir), Some(path)) = (config_dir(), config_path()) {
            assert!(path.starts_with(dir));
        }
    }
}
