//! Version control operations.
//!
//! The [`Vcs`] trait is the seam between the release steps and git. Every
//! method receives the [`WorkspaceHandle`] it operates on; nothing depends on
//! the process working directory.

pub mod branch;
pub mod sync;
pub mod system;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::VcsError;
use crate::workspace::WorkspaceHandle;

pub use branch::{BranchOutcome, ReleaseBranch, ensure_release_branch};
pub use sync::{SyncTarget, back_merge_stable, sync_integration_branch};
pub use system::SystemGit;

/// Git operations needed by a release.
#[cfg_attr(test, mockall::automock)]
pub trait Vcs: Send + Sync {
    /// True when the working tree has staged, unstaged or untracked changes.
    fn is_dirty(&self, ws: &WorkspaceHandle) -> Result<bool, VcsError>;

    fn checkout(&self, ws: &WorkspaceHandle, branch: &str) -> Result<(), VcsError>;

    /// Create `name` from the current HEAD and switch to it.
    fn create_branch(&self, ws: &WorkspaceHandle, name: &str) -> Result<(), VcsError>;

    fn fetch(&self, ws: &WorkspaceHandle) -> Result<(), VcsError>;

    fn pull(&self, ws: &WorkspaceHandle) -> Result<(), VcsError>;

    fn merge(&self, ws: &WorkspaceHandle, branch: &str) -> Result<(), VcsError>;

    fn stage(&self, ws: &WorkspaceHandle, paths: &[PathBuf]) -> Result<(), VcsError>;

    fn commit(&self, ws: &WorkspaceHandle, message: &str) -> Result<(), VcsError>;

    /// Push `branch` to `remote`, setting upstream.
    fn push(&self, ws: &WorkspaceHandle, remote: &str, branch: &str) -> Result<(), VcsError>;

    /// Local branch names.
    fn list_branches(&self, ws: &WorkspaceHandle) -> Result<BTreeSet<String>, VcsError>;

    /// Branch names known on `remote`, without the `{remote}/` prefix, as of
    /// the last fetch or clone.
    fn remote_branches(
        &self,
        ws: &WorkspaceHandle,
        remote: &str,
    ) -> Result<BTreeSet<String>, VcsError>;

    /// Content of the workspace-relative `path` as committed on `rev`,
    /// regardless of what is checked out.
    fn show_file(&self, ws: &WorkspaceHandle, rev: &str, path: &Path)
    -> Result<String, VcsError>;

    /// Clone `url` into the (empty or missing) directory of `dest`.
    fn clone_repository(&self, url: &str, dest: &WorkspaceHandle) -> Result<(), VcsError>;
}
