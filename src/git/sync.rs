//! Integration branch synchronisation.

use tracing::info;

use crate::error::VcsError;
use crate::workspace::WorkspaceHandle;

use super::Vcs;

/// Branch names and remote the sync works with.
#[derive(Debug, Clone)]
pub struct SyncTarget<'a> {
    pub integration: &'a str,
    pub stable: &'a str,
    pub remote: &'a str,
}

impl SyncTarget<'_> {
    /// Remote-tracking ref of the stable branch, fresh after a fetch.
    fn stable_ref(&self) -> String {
        format!("{}/{}", self.remote, self.stable)
    }
}

/// Switch to the integration branch, bring it up to date and merge the stable
/// branch into it.
///
/// Stops at the first failing step. A merge conflict is left for the operator
/// to resolve.
pub fn sync_integration_branch<V: Vcs + ?Sized>(
    vcs: &V,
    ws: &WorkspaceHandle,
    target: &SyncTarget<'_>,
) -> Result<(), VcsError> {
    vcs.checkout(ws, target.integration)?;
    info!(branch = target.integration, "Switched to integration branch");

    vcs.fetch(ws)?;
    vcs.pull(ws)?;
    info!("Fetched and pulled latest changes");

    let stable_ref = target.stable_ref();
    vcs.merge(ws, &stable_ref)?;
    info!(from = %stable_ref, into = target.integration, "Merged stable branch");

    Ok(())
}

/// After the release is merged, fold the stable branch back into the
/// integration branch and publish it.
pub fn back_merge_stable<V: Vcs + ?Sized>(
    vcs: &V,
    ws: &WorkspaceHandle,
    target: &SyncTarget<'_>,
) -> Result<(), VcsError> {
    sync_integration_branch(vcs, ws, target)?;
    vcs.push(ws, target.remote, target.integration)?;
    info!(branch = target.integration, "Pushed integration branch");
    Ok(())
}
