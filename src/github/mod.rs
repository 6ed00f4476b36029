//! GitHub operations: pull requests, check runs, labels and releases.
//!
//! [`HostingPlatform`] is what the release steps talk to. [`GitHubPlatform`]
//! implements it over octocrab for a single repository.

pub mod auth;
pub mod checks;
pub mod client;
pub mod retry;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::GitHubError;

pub use auth::get_github_token;
pub use checks::{
    AggregateCheckState, CheckConclusion, CheckOutcome, CheckPoller, CheckRun, CheckStatus,
    Sleeper, TokioSleeper, aggregate,
};
pub use client::{GitHubPlatform, parse_github_remote, parse_pull_request_url};

/// Code hosting operations a release needs, scoped to one repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostingPlatform: Send + Sync {
    /// Open a pull request from `head` into `base`, returning its number.
    /// An already open pull request for `head` is returned instead.
    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
    ) -> Result<u64, GitHubError>;

    /// Merge the open pull request whose head is `branch` with a merge
    /// commit, then delete the remote branch.
    async fn merge_pull_request(&self, branch: &str) -> Result<(), GitHubError>;

    /// SHA of the branch tip, `None` when GitHub reports nothing usable.
    async fn latest_commit_sha(&self, branch: &str) -> Result<Option<String>, GitHubError>;

    async fn check_runs(&self, sha: &str) -> Result<Vec<CheckRun>, GitHubError>;

    /// Label names of the pull request at `url`.
    async fn pull_request_labels(&self, url: &str) -> Result<Vec<String>, GitHubError>;

    /// Publish a release for `tag` with generated notes. Reuses an existing
    /// release for the same tag.
    async fn create_release(&self, tag: &str, title: &str) -> Result<(), GitHubError>;

    async fn release_notes(&self, tag: &str) -> Result<String, GitHubError>;

    async fn update_release_notes(&self, tag: &str, body: &str) -> Result<(), GitHubError>;
}

/// `owner/name` of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// HTTPS clone URL.
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = GitHubError;

    /// Accepts `owner/name` or any GitHub remote URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains("github.com") {
            let (owner, name) = parse_github_remote(s)?;
            return Ok(Self::new(owner, name));
        }

        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(GitHubError::InvalidRepositoryUrl),
        }
    }
}
