//! Explicit handle to the checkout a release step operates on.

use std::path::{Path, PathBuf};

/// A local working copy.
///
/// Every git and file operation receives one of these instead of relying on the
/// process working directory, so switching between the project checkout and a
/// scratch clone never leaks across steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceHandle {
    root: PathBuf,
}

impl WorkspaceHandle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path. Absolute paths pass through.
    pub fn join(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Strip the workspace root for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
