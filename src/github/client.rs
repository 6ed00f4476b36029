//! octocrab-backed [`HostingPlatform`].

use async_trait::async_trait;
use octocrab::Octocrab;
use octocrab::params::repos::Reference;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::GitHubError;

use super::checks::CheckRun;
use super::{HostingPlatform, RepoSlug};

#[derive(Debug, Deserialize)]
struct PullSummary {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct CommitSummary {
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckRunPage {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    check_runs: Vec<CheckRun>,
}

const CHECK_RUNS_PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct LabelSummary {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseSummary {
    id: u64,
    body: Option<String>,
}

#[derive(Serialize)]
struct NewPullRequest<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct MergeRequest<'a> {
    merge_method: &'a str,
}

#[derive(Serialize)]
struct NewRelease<'a> {
    tag_name: &'a str,
    name: &'a str,
    generate_release_notes: bool,
}

#[derive(Serialize)]
struct ReleaseBodyUpdate<'a> {
    body: &'a str,
}

/// A GitHub repository reached through octocrab.
#[derive(Debug, Clone)]
pub struct GitHubPlatform {
    client: Octocrab,
    repo: RepoSlug,
}

impl GitHubPlatform {
    /// Build a client authenticated with `token`.
    pub fn new(token: &str, repo: RepoSlug) -> Result<Self, GitHubError> {
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| api_error("build client", e))?;
        Ok(Self::with_client(client, repo))
    }

    /// Use a pre-configured client, e.g. one pointed at a mock server.
    pub fn with_client(client: Octocrab, repo: RepoSlug) -> Self {
        Self { client, repo }
    }

    pub fn repo(&self) -> &RepoSlug {
        &self.repo
    }

    fn route(&self, tail: &str) -> String {
        format!("/repos/{}/{}/{}", self.repo.owner, self.repo.name, tail)
    }

    async fn open_pull_request_for(&self, branch: &str) -> Result<Option<u64>, GitHubError> {
        let head = format!("{}:{}", self.repo.owner, branch);
        let params = [("state", "open"), ("head", head.as_str())];
        let pulls: Vec<PullSummary> = self
            .client
            .get(self.route("pulls"), Some(&params))
            .await
            .map_err(|e| classify_error("list pull requests", e))?;
        Ok(pulls.first().map(|pr| pr.number))
    }

    async fn release_by_tag(&self, tag: &str) -> Result<Option<ReleaseSummary>, GitHubError> {
        let result: Result<ReleaseSummary, _> = self
            .client
            .get(self.route(&format!("releases/tags/{}", tag)), None::<&()>)
            .await;

        match result {
            Ok(release) => Ok(Some(release)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(classify_error("get release", e)),
        }
    }
}

#[async_trait]
impl HostingPlatform for GitHubPlatform {
    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
    ) -> Result<u64, GitHubError> {
        if let Some(number) = self.open_pull_request_for(head).await? {
            info!(number, head, "Pull request already open, reusing it");
            return Ok(number);
        }

        let body = NewPullRequest {
            title,
            head,
            base,
            body: "",
        };
        let created: PullSummary = self
            .client
            .post(self.route("pulls"), Some(&body))
            .await
            .map_err(|e| classify_error("create pull request", e))?;

        info!(number = created.number, head, base, "Opened pull request");
        Ok(created.number)
    }

    async fn merge_pull_request(&self, branch: &str) -> Result<(), GitHubError> {
        let number = self
            .open_pull_request_for(branch)
            .await?
            .ok_or_else(|| GitHubError::PullRequestNotFound(branch.to_string()))?;

        let _: Value = self
            .client
            .put(
                self.route(&format!("pulls/{}/merge", number)),
                Some(&MergeRequest {
                    merge_method: "merge",
                }),
            )
            .await
            .map_err(|e| classify_error("merge pull request", e))?;
        info!(number, branch, "Merged pull request");

        // The merge already happened; a leftover branch is only clutter.
        if let Err(e) = self
            .client
            .repos(&self.repo.owner, &self.repo.name)
            .delete_ref(&Reference::Branch(branch.to_string()))
            .await
        {
            warn!(branch, error = %e, "Could not delete merged branch");
        }

        Ok(())
    }

    async fn latest_commit_sha(&self, branch: &str) -> Result<Option<String>, GitHubError> {
        let commit: CommitSummary = self
            .client
            .get(self.route(&format!("commits/{}", branch)), None::<&()>)
            .await
            .map_err(|e| classify_error("get latest commit", e))?;

        Ok(commit.sha.filter(|sha| !sha.trim().is_empty()))
    }

    async fn check_runs(&self, sha: &str) -> Result<Vec<CheckRun>, GitHubError> {
        let route = self.route(&format!("commits/{}/check-runs", sha));
        let per_page = CHECK_RUNS_PER_PAGE.to_string();
        let mut runs = Vec::new();

        for number in 1u32.. {
            let page_number = number.to_string();
            let params = [("per_page", per_page.as_str()), ("page", page_number.as_str())];
            let page: CheckRunPage = self
                .client
                .get(route.as_str(), Some(&params))
                .await
                .map_err(|e| classify_error("list check runs", e))?;

            let fetched = page.check_runs.len();
            runs.extend(page.check_runs);
            if fetched == 0 || runs.len() >= page.total_count {
                break;
            }
        }

        debug!(sha, count = runs.len(), "Fetched check runs");
        Ok(runs)
    }

    async fn pull_request_labels(&self, url: &str) -> Result<Vec<String>, GitHubError> {
        let (repo, number) = parse_pull_request_url(url)?;
        let route = format!("/repos/{}/{}/issues/{}/labels", repo.owner, repo.name, number);

        let labels: Vec<LabelSummary> = self
            .client
            .get(route, None::<&()>)
            .await
            .map_err(|e| classify_error("get pull request labels", e))?;

        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn create_release(&self, tag: &str, title: &str) -> Result<(), GitHubError> {
        if self.release_by_tag(tag).await?.is_some() {
            info!(tag, "Release already exists, reusing it");
            return Ok(());
        }

        let body = NewRelease {
            tag_name: tag,
            name: title,
            generate_release_notes: true,
        };
        let _: Value = self
            .client
            .post(self.route("releases"), Some(&body))
            .await
            .map_err(|e| classify_error("create release", e))?;

        info!(tag, "Created release");
        Ok(())
    }

    async fn release_notes(&self, tag: &str) -> Result<String, GitHubError> {
        let release = self
            .release_by_tag(tag)
            .await?
            .ok_or_else(|| GitHubError::ReleaseNotFound(tag.to_string()))?;
        Ok(release.body.unwrap_or_default())
    }

    async fn update_release_notes(&self, tag: &str, body: &str) -> Result<(), GitHubError> {
        let release = self
            .release_by_tag(tag)
            .await?
            .ok_or_else(|| GitHubError::ReleaseNotFound(tag.to_string()))?;

        let _: Value = self
            .client
            .patch(
                self.route(&format!("releases/{}", release.id)),
                Some(&ReleaseBodyUpdate { body }),
            )
            .await
            .map_err(|e| classify_error("update release", e))?;

        info!(tag, "Updated release notes");
        Ok(())
    }
}

fn api_error(operation: &str, e: octocrab::Error) -> GitHubError {
    GitHubError::Api {
        operation: operation.to_string(),
        source: Box::new(e),
    }
}

/// Check error content using both Display and Debug output, since octocrab
/// does not surface the status code uniformly.
fn error_text(e: &octocrab::Error) -> (String, String) {
    (e.to_string(), format!("{:?}", e))
}

fn is_not_found(e: &octocrab::Error) -> bool {
    let (display, debug) = error_text(e);
    display.contains("Not Found") || debug.contains("Not Found")
}

fn classify_error(operation: &str, e: octocrab::Error) -> GitHubError {
    let (display, debug) = error_text(&e);
    if display.to_lowercase().contains("rate limit") || debug.to_lowercase().contains("rate limit")
    {
        return GitHubError::RateLimited {
            reset_time: "unknown".to_string(),
        };
    }
    api_error(operation, e)
}

/// Extract owner and repo from a git remote URL.
pub fn parse_github_remote(url: &str) -> Result<(String, String), GitHubError> {
    // SSH: git@github.com:owner/repo.git
    if let Some(path) = url.strip_prefix("git@github.com:") {
        return parse_owner_repo_path(path);
    }

    // HTTPS: https://github.com/owner/repo.git
    if let Some(path) = url.split("github.com/").nth(1) {
        return parse_owner_repo_path(path);
    }

    Err(GitHubError::InvalidRepositoryUrl)
}

fn parse_owner_repo_path(path: &str) -> Result<(String, String), GitHubError> {
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');

    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GitHubError::InvalidRepositoryUrl),
    }
}

/// Split `https://github.com/{owner}/{repo}/pull/{n}` into its repository
/// and number.
pub fn parse_pull_request_url(url: &str) -> Result<(RepoSlug, u64), GitHubError> {
    let invalid = || GitHubError::InvalidPullRequestUrl(url.to_string());

    let path = url.split("github.com/").nth(1).ok_or_else(invalid)?;
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    match segments.as_slice() {
        [owner, repo, "pull", number, ..] if !owner.is_empty() && !repo.is_empty() => {
            let number = number.parse::<u64>().map_err(|_| invalid())?;
            Ok((RepoSlug::new(*owner, *repo), number))
        }
        _ => Err(invalid()),
    }
}
