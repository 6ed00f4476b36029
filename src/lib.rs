//! conductor - drives a library release end to end.
//!
//! # Overview
//!
//! conductor bumps the version of a project, prepares a release branch,
//! refuses to ship while declarations are still deprecated for the new
//! version, opens and merges the release pull request once CI is green,
//! publishes a GitHub release with notes grouped by pull request label,
//! propagates the version to the documentation repository and merges the
//! stable branch back into the integration branch.

pub mod changelog;
pub mod config;
pub mod error;
pub mod files;
pub mod git;
pub mod github;
pub mod ship;
pub mod version;
pub mod workspace;

// Re-export commonly used types
pub use config::ReleaseConfig;
pub use error::{ConfigError, FileStoreError, GitHubError, ReleaseError, VcsError};
pub use ship::{ReleaseOrchestrator, ReleasePlan, ReleaseReport};
pub use version::ReleaseKind;
pub use workspace::WorkspaceHandle;
