//! Release branch creation and reuse.

use std::fmt;

use semver::Version;
use tracing::info;

use crate::error::VcsError;
use crate::workspace::WorkspaceHandle;

use super::Vcs;

/// A `release/v{version}` branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseBranch {
    pub title: String,
}

impl ReleaseBranch {
    pub fn for_version(version: &Version) -> Self {
        Self {
            title: format!("release/v{}", version),
        }
    }
}

impl fmt::Display for ReleaseBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Whether the release branch was made by this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    Created,
    Reused,
}

/// Check out the release branch for `version`, creating it from
/// `integration` when it does not exist yet.
///
/// Safe to call again after an interrupted run: an existing branch is only
/// checked out.
pub fn ensure_release_branch<V: Vcs + ?Sized>(
    vcs: &V,
    ws: &WorkspaceHandle,
    version: &Version,
    integration: &str,
) -> Result<(ReleaseBranch, BranchOutcome), VcsError> {
    let branch = ReleaseBranch::for_version(version);
    let existing = vcs.list_branches(ws)?;

    if existing.contains(&branch.title) {
        info!(branch = %branch, "Release branch already exists, checking it out");
        vcs.checkout(ws, &branch.title)?;
        return Ok((branch, BranchOutcome::Reused));
    }

    info!(branch = %branch, from = integration, "Creating release branch");
    vcs.checkout(ws, integration)?;
    vcs.create_branch(ws, &branch.title)?;
    Ok((branch, BranchOutcome::Created))
}
