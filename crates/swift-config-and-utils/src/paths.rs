//! File system paths for the Swift browser.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name created under the user's home directory.
const BASE_DIR_NAME: &str = ".swift-browser";

/// Manages file system paths for the Swift browser.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for local files (~/.swift-browser)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.swift-browser`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or(CoreError::NoHomeDir)?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.swift-browser).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.swift-browser/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the downloads directory (~/.swift-browser/downloads).
    pub fn downloads_dir(&self) -> PathBuf {
        self.base_dir.join("downloads")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        for dir in [self.base_dir.clone(), self.downloads_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(|source| CoreError::CreateDir { path: dir, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_with_base_dir() {
        let base = PathBuf::from("/tmp/test-swift-browser");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.base_dir(), &base);
        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(paths.downloads_dir(), base.join("downloads"));
    }

    #[test]
    fn test_paths_default_under_home() {
        let paths = Paths::new().unwrap();
        let home = dirs::home_dir().unwrap();

        assert_eq!(paths.base_dir(), &home.join(".swift-browser"));
    }

    #[test]
    fn test_ensure_dirs_idempotent() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("swift-browser");
        let paths = Paths::with_base_dir(base.clone());

        assert!(!base.exists());

        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(base.is_dir());
        assert!(paths.downloads_dir().is_dir());
    }
}
