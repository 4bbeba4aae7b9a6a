//! Per-submission scratch directories.
//!
//! Each submission gets its own directory under the configured root. A
//! [`Workspace`] owns its directory: it is removed by [`Workspace::destroy`],
//! or, if a code path forgets to call it, when the value is dropped.

use crate::errors::ExecutionError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh directory named after the submission id.
    pub async fn create(&self, id: &str) -> Result<Workspace, ExecutionError> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            ExecutionError::IoError(format!(
                "Failed to create workspace root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let prefix = format!("{}-", id);
        let dir = Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.root)
            .map_err(|e| {
                ExecutionError::IoError(format!("Failed to create workspace for {}: {}", id, e))
            })?;

        log::debug!("Created workspace {}", dir.path().display());
        Ok(Workspace { dir })
    }
}

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a source file into the workspace and return its full path.
    pub async fn write_source(&self, file_name: &str, content: &str) -> Result<PathBuf, ExecutionError> {
        let path = self.dir.path().join(file_name);
        fs::write(&path, content).await.map_err(|e| {
            ExecutionError::IoError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    /// Remove the directory. A directory that is already gone counts as removed;
    /// other failures are logged rather than returned.
    pub async fn destroy(self) {
        let path = self.dir.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || self.dir.close()).await;

        match result {
            Ok(Ok(())) => log::debug!("Removed workspace {}", path.display()),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Workspace {} was already removed", path.display())
            }
            Ok(Err(e)) => log::error!("Cleanup error for {}: {}", path.display(), e),
            Err(e) => log::error!("Cleanup task for {} failed: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_create_write_destroy() {
        let root = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(root.path().join("ws"));

        let workspace = manager.create("abc").await.unwrap();
        let dir = workspace.path().to_path_buf();
        assert!(dir.is_dir());
        assert!(dir.file_name().unwrap().to_string_lossy().starts_with("abc-"));

        let source = workspace.write_source("main.py", "print(1)\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&source).unwrap(), "print(1)\n");

        workspace.destroy().await;
        assert!(!dir.exists());
        assert_eq!(entries(manager.root()), 0);
    }

    #[tokio::test]
    async fn test_destroy_tolerates_missing_directory() {
        let root = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let workspace = manager.create("gone").await.unwrap();
        std::fs::remove_dir_all(workspace.path()).unwrap();

        // must not panic
        workspace.destroy().await;
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let dir = {
            let workspace = manager.create("dropped").await.unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_distinct_ids_get_distinct_directories() {
        let root = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let a = manager.create("one").await.unwrap();
        let b = manager.create("two").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(entries(root.path()), 2);
    }
}
