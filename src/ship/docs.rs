//! Version propagation to the documentation repository.

use semver::Version;
use tracing::info;

use crate::error::ReleaseError;
use crate::files::FileStore;
use crate::git::Vcs;
use crate::github::{HostingPlatform, RepoSlug};
use crate::workspace::WorkspaceHandle;

use super::rewrite::VersionRewriter;

/// Result of a docs propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsUpdate {
    pub branch: String,
    /// `None` when no documentation page mentioned the old version.
    pub pull_request: Option<u64>,
}

/// Where the docs live and how to reach them.
pub struct DocsTarget<'a, H: ?Sized> {
    pub repository: &'a RepoSlug,
    pub hosting: &'a H,
    pub extension: &'a str,
    pub remote: &'a str,
    /// Branch the update is merged into.
    pub base: &'a str,
}

pub fn docs_branch_name(project: &str, new: &Version) -> String {
    format!("update_{}_version_to_{}", project.to_lowercase(), new)
}

/// Clone the docs into `scratch`, replace the version in every page, push a
/// branch and merge it through a pull request.
///
/// A branch left on the remote by an interrupted run is checked out and
/// finished, even when its pages need no further change.
///
/// `scratch` must be empty or absent; the caller owns its cleanup.
#[allow(clippy::too_many_arguments)]
pub async fn propagate_version<V, F, H>(
    vcs: &V,
    files: &F,
    target: &DocsTarget<'_, H>,
    scratch: &WorkspaceHandle,
    project: &str,
    old: &Version,
    new: &Version,
) -> Result<DocsUpdate, ReleaseError>
where
    V: Vcs + ?Sized,
    F: FileStore + ?Sized,
    H: HostingPlatform + ?Sized,
{
    let branch = docs_branch_name(project, new);

    vcs.clone_repository(&target.repository.clone_url(), scratch)?;
    info!(repository = %target.repository, "Cloned documentation repository");

    // A fresh clone only has the default branch locally; a branch pushed by
    // an earlier run shows up as remote-tracking
    let pushed_before = vcs
        .remote_branches(scratch, target.remote)?
        .contains(&branch);
    if pushed_before {
        info!(branch = %branch, "Documentation branch already pushed, continuing it");
        vcs.checkout(scratch, &branch)?;
    } else {
        vcs.create_branch(scratch, &branch)?;
    }

    let pages = files.walk_files(scratch.root(), target.extension)?;
    let changed = VersionRewriter::new(vcs, files).rewrite_and_commit(
        scratch,
        &pages,
        old,
        new,
        "Update version",
    )?;

    if !changed.committed && !pushed_before {
        info!(repository = %target.repository, "Documentation already up to date");
        return Ok(DocsUpdate {
            branch,
            pull_request: None,
        });
    }

    vcs.push(scratch, target.remote, &branch)?;

    let title = format!("Update {} version: {} -> {}", project, old, new);
    let number = target
        .hosting
        .create_pull_request(&title, &branch, target.base)
        .await?;
    target.hosting.merge_pull_request(&branch).await?;
    info!(number, "Merged documentation update");

    Ok(DocsUpdate {
        branch,
        pull_request: Some(number),
    })
}
