//! [`Vcs`] backed by the system `git` binary and git2.
//!
//! Mutating operations shell out to `git`, inheriting the user's existing git
//! config, SSH agent, and credential store. Read-only queries (status, branch
//! listing, file content at a revision) go through git2.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{BranchType, Repository, StatusOptions};
use tracing::debug;

use crate::error::VcsError;
use crate::workspace::WorkspaceHandle;

use super::Vcs;

/// System git implementation.
pub struct SystemGit;

impl SystemGit {
    fn open(ws: &WorkspaceHandle) -> Result<Repository, VcsError> {
        Repository::open(ws.root()).map_err(|source| VcsError::OpenRepository {
            path: ws.root().to_path_buf(),
            source,
        })
    }
}

impl Vcs for SystemGit {
    fn is_dirty(&self, ws: &WorkspaceHandle) -> Result<bool, VcsError> {
        let repo = Self::open(ws)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);

        let statuses = repo.statuses(Some(&mut opts)).map_err(VcsError::Query)?;
        Ok(!statuses.is_empty())
    }

    fn checkout(&self, ws: &WorkspaceHandle, branch: &str) -> Result<(), VcsError> {
        run_git(ws.root(), &["checkout", branch], "checkout").map(drop)
    }

    fn create_branch(&self, ws: &WorkspaceHandle, name: &str) -> Result<(), VcsError> {
        run_git(ws.root(), &["checkout", "-b", name], "create branch").map(drop)
    }

    fn fetch(&self, ws: &WorkspaceHandle) -> Result<(), VcsError> {
        run_git(ws.root(), &["fetch"], "fetch").map(drop)
    }

    fn pull(&self, ws: &WorkspaceHandle) -> Result<(), VcsError> {
        run_git(ws.root(), &["pull", "--no-rebase", "--no-edit"], "pull").map(drop)
    }

    fn merge(&self, ws: &WorkspaceHandle, branch: &str) -> Result<(), VcsError> {
        run_git(ws.root(), &["merge", "--no-edit", branch], "merge").map(drop)
    }

    fn stage(&self, ws: &WorkspaceHandle, paths: &[PathBuf]) -> Result<(), VcsError> {
        let file_args: Vec<&str> = paths.iter().filter_map(|p| p.to_str()).collect();
        if file_args.is_empty() {
            return Err(VcsError::CommandFailed {
                operation: "stage files".into(),
                stderr: "No files to stage".into(),
            });
        }

        let mut add_args = vec!["add", "--"];
        add_args.extend(file_args);

        run_git(ws.root(), &add_args, "stage files").map(drop)
    }

    fn commit(&self, ws: &WorkspaceHandle, message: &str) -> Result<(), VcsError> {
        run_git(ws.root(), &["commit", "-m", message], "commit").map(drop)
    }

    fn push(&self, ws: &WorkspaceHandle, remote: &str, branch: &str) -> Result<(), VcsError> {
        run_git(ws.root(), &["push", "--set-upstream", remote, branch], "push").map(drop)
    }

    fn list_branches(&self, ws: &WorkspaceHandle) -> Result<BTreeSet<String>, VcsError> {
        let repo = Self::open(ws)?;
        let mut names = BTreeSet::new();

        for entry in repo.branches(Some(BranchType::Local)).map_err(VcsError::Query)? {
            let (branch, _) = entry.map_err(VcsError::Query)?;
            if let Some(name) = branch.name().map_err(VcsError::Query)? {
                names.insert(name.to_string());
            }
        }

        Ok(names)
    }

    fn remote_branches(
        &self,
        ws: &WorkspaceHandle,
        remote: &str,
    ) -> Result<BTreeSet<String>, VcsError> {
        let repo = Self::open(ws)?;
        let prefix = format!("{}/", remote);
        let mut names = BTreeSet::new();

        for entry in repo.branches(Some(BranchType::Remote)).map_err(VcsError::Query)? {
            let (branch, _) = entry.map_err(VcsError::Query)?;
            if let Some(name) = branch.name().map_err(VcsError::Query)?
                && let Some(short) = name.strip_prefix(&prefix)
                && short != "HEAD"
            {
                names.insert(short.to_string());
            }
        }

        Ok(names)
    }

    fn show_file(&self, ws: &WorkspaceHandle, rev: &str, path: &Path) -> Result<String, VcsError> {
        let repo = Self::open(ws)?;
        let at_rev = |source: git2::Error| VcsError::FileAtRevision {
            rev: rev.to_string(),
            path: path.to_path_buf(),
            source,
        };

        let tree = repo
            .revparse_single(rev)
            .and_then(|object| object.peel_to_tree())
            .map_err(at_rev)?;
        let blob = tree
            .get_path(path)
            .and_then(|entry| entry.to_object(&repo))
            .and_then(|object| object.peel_to_blob())
            .map_err(at_rev)?;

        debug!(rev, path = %path.display(), "Read file at revision");
        Ok(String::from_utf8_lossy(blob.content()).into_owned())
    }

    fn clone_repository(&self, url: &str, dest: &WorkspaceHandle) -> Result<(), VcsError> {
        let target = dest.root().to_str().ok_or_else(|| VcsError::CommandFailed {
            operation: "clone".into(),
            stderr: format!("Non UTF-8 destination path: {}", dest.root().display()),
        })?;
        let parent = dest.root().parent().unwrap_or_else(|| Path::new("."));

        run_git(parent, &["clone", url, target], "clone").map(drop)
    }
}

/// Run a git command in `dir` and return its stdout, or a descriptive error.
fn run_git(dir: &Path, args: &[&str], operation: &str) -> Result<String, VcsError> {
    debug!(dir = %dir.display(), ?args, "Running git");

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|source| VcsError::SpawnFailed {
            operation: operation.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VcsError::CommandFailed {
            operation: operation.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
