//! Checks that run before a release touches anything.

use git2::Repository;
use tracing::debug;

use crate::error::{ConfigError, ReleaseError};
use crate::git::Vcs;
use crate::github::{RepoSlug, parse_github_remote};
use crate::workspace::WorkspaceHandle;

/// Fail early when the `git` binary is not on PATH.
pub fn check_git_installed() -> Result<(), ReleaseError> {
    match which::which("git") {
        Ok(path) => {
            debug!(path = %path.display(), "Found git");
            Ok(())
        }
        Err(_) => Err(ReleaseError::ToolMissing("git".to_string())),
    }
}

/// Refuse to start with uncommitted or untracked changes.
pub fn ensure_clean_working_tree<V: Vcs + ?Sized>(
    vcs: &V,
    ws: &WorkspaceHandle,
) -> Result<(), ReleaseError> {
    if vcs.is_dirty(ws)? {
        return Err(ReleaseError::DirtyWorkingTree);
    }
    Ok(())
}

/// The GitHub repository to release: the configured one, or the one the
/// `remote` of the workspace points at.
pub fn resolve_repository(
    ws: &WorkspaceHandle,
    remote: &str,
    configured: Option<&RepoSlug>,
) -> Result<RepoSlug, ConfigError> {
    if let Some(slug) = configured {
        return Ok(slug.clone());
    }

    let missing = || ConfigError::MissingRepository {
        remote: remote.to_string(),
    };

    let repo = Repository::open(ws.root()).map_err(|_| missing())?;
    let remote_handle = repo.find_remote(remote).map_err(|_| missing())?;
    let url = remote_handle.url().ok_or_else(missing)?;

    let (owner, name) = parse_github_remote(url).map_err(|_| missing())?;
    debug!(%owner, %name, remote, "Derived repository from remote");
    Ok(RepoSlug::new(owner, name))
}
