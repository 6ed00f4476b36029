//! Error types for conductor modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from configuration and version discovery.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Property '{key}' not found in {path}")]
    MissingVersion { key: String, path: PathBuf },

    #[error("Malformed version '{0}': expected MAJOR.MINOR.PATCH with non-negative integers")]
    MalformedVersion(String),

    #[error("Unknown release kind '{0}'. Use 'minor' (1) or 'patch' (2)")]
    UnknownReleaseKind(String),

    #[error("Invalid config file {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("No GitHub repository configured and none could be derived from the '{remote}' remote")]
    MissingRepository { remote: String },
}

/// Errors from version control operations.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Failed to run git {operation}: {source}")]
    SpawnFailed {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },

    #[error("Failed to open repository at {path}: {source}")]
    OpenRepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Repository query failed: {0}")]
    Query(#[source] git2::Error),

    #[error("Cannot read {path} at {rev}: {source}")]
    FileAtRevision {
        rev: String,
        path: PathBuf,
        #[source]
        source: git2::Error,
    },
}

/// Errors from GitHub API operations.
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error(
        "GitHub authentication failed: no valid auth found. Run 'gh auth login' or set GITHUB_TOKEN environment variable"
    )]
    AuthenticationFailed,

    #[error("GitHub request failed ({operation}): {source}")]
    Api {
        operation: String,
        #[source]
        source: Box<octocrab::Error>,
    },

    #[error("Rate limited by GitHub API. Resets at: {reset_time}")]
    RateLimited { reset_time: String },

    #[error("No open pull request found for branch '{0}'")]
    PullRequestNotFound(String),

    #[error("Release for tag '{0}' not found")]
    ReleaseNotFound(String),

    #[error("Failed to parse repository URL")]
    InvalidRepositoryUrl,

    #[error("Not a pull request URL: {0}")]
    InvalidPullRequestUrl(String),

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<GitHubError>),
}

impl GitHubError {
    /// Whether repeating the request may succeed. Auth, lookup and rate-limit
    /// failures will not clear up within a retry window.
    pub fn is_transient(&self) -> bool {
        matches!(self, GitHubError::Api { .. })
    }
}

/// Errors from reading and writing workspace files.
#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {path}: {reason}")]
    WalkFailed { path: PathBuf, reason: String },
}

/// Errors that abort a release run.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Working tree has uncommitted changes. Commit or stash them before releasing.")]
    DirtyWorkingTree,

    #[error("Version control operation failed: {0}")]
    VcsOperation(#[from] VcsError),

    #[error("Could not resolve the latest commit of branch '{branch}'")]
    UnresolvableCommit { branch: String },

    #[error("{} file(s) still carry deprecations scheduled for {version}", files.len())]
    DeprecationPresent { version: String, files: Vec<PathBuf> },

    #[error("CI checks failed for commit {sha}: {}", failed.join(", "))]
    ChecksFailed { sha: String, failed: Vec<String> },

    #[error("GitHub operation failed: {0}")]
    Hosting(#[from] GitHubError),

    #[error("File operation failed: {0}")]
    FileStore(#[from] FileStoreError),

    #[error("{0} is required but was not found on PATH")]
    ToolMissing(String),

    #[error("Release cancelled by user")]
    Cancelled,
}
