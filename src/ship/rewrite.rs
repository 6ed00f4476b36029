//! Version string replacement across the configured files.

use std::path::PathBuf;

use semver::Version;
use tracing::{debug, info};

use crate::error::ReleaseError;
use crate::files::FileStore;
use crate::git::Vcs;
use crate::workspace::WorkspaceHandle;

/// Result of a rewrite pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Files whose content changed, absolute.
    pub changed: Vec<PathBuf>,
    pub committed: bool,
}

/// Replaces every occurrence of the old version with the new one.
pub struct VersionRewriter<'a, V: ?Sized, F: ?Sized> {
    vcs: &'a V,
    files: &'a F,
}

impl<'a, V, F> VersionRewriter<'a, V, F>
where
    V: Vcs + ?Sized,
    F: FileStore + ?Sized,
{
    pub fn new(vcs: &'a V, files: &'a F) -> Self {
        Self { vcs, files }
    }

    /// Rewrite `targets` without touching git. Returns the changed files.
    pub fn replace_in_files(
        &self,
        ws: &WorkspaceHandle,
        targets: &[PathBuf],
        old: &Version,
        new: &Version,
    ) -> Result<Vec<PathBuf>, ReleaseError> {
        let (old, new) = (old.to_string(), new.to_string());
        let mut changed = Vec::new();

        for target in targets {
            let path = ws.join(target);
            let content = self.files.read_to_string(&path)?;
            let updated = content.replace(&old, &new);

            if updated == content {
                debug!(path = %ws.relative(&path).display(), "Version not present, file unchanged");
                continue;
            }

            self.files.write(&path, &updated)?;
            info!(path = %ws.relative(&path).display(), "Updated version");
            changed.push(path);
        }

        Ok(changed)
    }

    /// Rewrite `targets` and commit the result with `message`. Nothing is
    /// committed when no file changed, so a re-run is harmless.
    pub fn rewrite_and_commit(
        &self,
        ws: &WorkspaceHandle,
        targets: &[PathBuf],
        old: &Version,
        new: &Version,
        message: &str,
    ) -> Result<RewriteOutcome, ReleaseError> {
        let changed = self.replace_in_files(ws, targets, old, new)?;
        if changed.is_empty() {
            return Ok(RewriteOutcome::default());
        }

        self.vcs.stage(ws, &changed)?;
        self.vcs.commit(ws, message)?;

        Ok(RewriteOutcome {
            changed,
            committed: true,
        })
    }
}

/// Commit message for the version bump.
pub fn version_commit_message(project: &str, old: &Version, new: &Version) -> String {
    format!("Replace {} version {} with {}", project, old, new)
}
