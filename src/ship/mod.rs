//! Ship pipeline: the release flow from version bump to back-merge.
//!
//! [`ReleaseOrchestrator`] runs the steps in order against injected git,
//! GitHub, file and sleep implementations:
//!
//! 1. compute the old and new versions
//! 2. require a clean working tree
//! 3. sync the integration branch with stable
//! 4. create or reuse the release branch
//! 5. rewrite the version, committing only real changes
//! 6. stop if anything is still deprecated for the new version
//! 7. push and open the release pull request
//! 8. wait for CI checks
//! 9. merge the pull request
//! 10. publish the release and regroup its notes by label
//! 11. bump the version in the documentation repository
//! 12. merge stable back into integration and push
//!
//! Nothing after step 6 is rolled back on failure. Every step tolerates a
//! re-run after an interrupted release: versions are planned from the
//! integration branch, an existing release branch is reused and an
//! unchanged version commits nothing.

pub mod deprecation;
pub mod docs;
pub mod preflight;
pub mod rewrite;

use semver::Version;
use tracing::{debug, info, warn};

use crate::changelog::regenerate_release_notes;
use crate::config::ReleaseConfig;
use crate::error::{FileStoreError, ReleaseError};
use crate::files::FileStore;
use crate::git::{
    BranchOutcome, ReleaseBranch, SyncTarget, Vcs, back_merge_stable, ensure_release_branch,
    sync_integration_branch,
};
use crate::github::{CheckOutcome, CheckPoller, HostingPlatform, Sleeper};
use crate::version::{ReleaseKind, calculate_next_version, version_from_properties};
use crate::workspace::WorkspaceHandle;

use self::deprecation::find_deprecated_files;
use self::docs::{DocsTarget, DocsUpdate, propagate_version};
use self::preflight::ensure_clean_working_tree;
use self::rewrite::{VersionRewriter, version_commit_message};

/// What a release will do, computed before anything is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    pub kind: ReleaseKind,
    pub old_version: Version,
    pub new_version: Version,
    pub branch: ReleaseBranch,
    pub tag: String,
}

impl ReleasePlan {
    pub fn pull_request_title(&self) -> String {
        format!("Release/v{}", self.new_version)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub old_version: Version,
    pub new_version: Version,
    pub branch: ReleaseBranch,
    pub version_committed: bool,
    pub pull_request: Option<u64>,
    pub head_sha: Option<String>,
    /// Set once the release is published.
    pub tag: Option<String>,
    pub docs: Option<DocsUpdate>,
    pub dry_run: bool,
}

impl ReleaseReport {
    fn new(plan: &ReleasePlan, dry_run: bool) -> Self {
        Self {
            old_version: plan.old_version.clone(),
            new_version: plan.new_version.clone(),
            branch: plan.branch.clone(),
            version_committed: false,
            pull_request: None,
            head_sha: None,
            tag: None,
            docs: None,
            dry_run,
        }
    }
}

fn done(message: impl AsRef<str>) {
    println!("  [DONE] {}", message.as_ref());
}

fn skip(message: impl AsRef<str>) {
    println!("  [SKIP] {}", message.as_ref());
}

/// Runs a release against the given collaborators.
pub struct ReleaseOrchestrator<'a, V: ?Sized, H: ?Sized, F: ?Sized, S: ?Sized> {
    ws: WorkspaceHandle,
    config: &'a ReleaseConfig,
    vcs: &'a V,
    hosting: &'a H,
    files: &'a F,
    sleeper: &'a S,
    docs_hosting: Option<&'a H>,
    dry_run: bool,
}

impl<'a, V, H, F, S> ReleaseOrchestrator<'a, V, H, F, S>
where
    V: Vcs + ?Sized,
    H: HostingPlatform + ?Sized,
    F: FileStore + ?Sized,
    S: Sleeper + ?Sized,
{
    pub fn new(
        ws: WorkspaceHandle,
        config: &'a ReleaseConfig,
        vcs: &'a V,
        hosting: &'a H,
        files: &'a F,
        sleeper: &'a S,
    ) -> Self {
        Self {
            ws,
            config,
            vcs,
            hosting,
            files,
            sleeper,
            docs_hosting: None,
            dry_run: false,
        }
    }

    /// Client for the documentation repository. Without one, step 11 is
    /// skipped.
    pub fn with_docs_hosting(mut self, hosting: &'a H) -> Self {
        self.docs_hosting = Some(hosting);
        self
    }

    /// Stop after the deprecation gate, before anything leaves the machine.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn sync_target(&self) -> SyncTarget<'a> {
        SyncTarget {
            integration: &self.config.branches.integration,
            stable: &self.config.branches.stable,
            remote: &self.config.branches.remote,
        }
    }

    /// Step 1: read the current version and derive the new one.
    ///
    /// The version comes from the integration branch, not the checkout. After
    /// an interrupted run the checkout is the already bumped release branch,
    /// and reading it would plan the release after this one.
    pub fn plan(&self, kind: ReleaseKind) -> Result<ReleasePlan, ReleaseError> {
        let content = self.integration_version_file()?;
        let old_version = version_from_properties(
            &content,
            &self.config.project.version_key,
            &self.ws.join(&self.config.project.version_file),
        )?;
        let new_version = calculate_next_version(&old_version, kind);

        Ok(ReleasePlan {
            kind,
            branch: ReleaseBranch::for_version(&new_version),
            tag: format!("v{}", new_version),
            old_version,
            new_version,
        })
    }

    /// The version file as committed on the local integration branch, or on
    /// its remote-tracking branch when there is no local one.
    fn integration_version_file(&self) -> Result<String, ReleaseError> {
        let branches = &self.config.branches;
        let path = &self.config.project.version_file;

        match self.vcs.show_file(&self.ws, &branches.integration, path) {
            Ok(content) => Ok(content),
            Err(local) => {
                let tracking = format!("{}/{}", branches.remote, branches.integration);
                debug!(error = %local, rev = %tracking, "No local integration branch, trying remote");
                Ok(self.vcs.show_file(&self.ws, &tracking, path)?)
            }
        }
    }

    /// Plan and execute a release of `kind`.
    pub async fn run(&self, kind: ReleaseKind) -> Result<ReleaseReport, ReleaseError> {
        let plan = self.plan(kind)?;
        self.execute(&plan).await
    }

    /// Steps 2 to 12 for an already computed plan.
    pub async fn execute(&self, plan: &ReleasePlan) -> Result<ReleaseReport, ReleaseError> {
        let ws = &self.ws;
        let config = self.config;
        let mut report = ReleaseReport::new(plan, self.dry_run);

        ensure_clean_working_tree(self.vcs, ws)?;
        done("Working tree is clean");

        let target = self.sync_target();
        sync_integration_branch(self.vcs, ws, &target)?;
        done(format!(
            "Merged {}/{} into {}",
            target.remote, target.stable, target.integration
        ));

        let (branch, outcome) =
            ensure_release_branch(self.vcs, ws, &plan.new_version, target.integration)?;
        match outcome {
            BranchOutcome::Created => done(format!("Created branch {}", branch)),
            BranchOutcome::Reused => skip(format!("Branch {} exists, reusing it", branch)),
        }

        let message =
            version_commit_message(&config.project.name, &plan.old_version, &plan.new_version);
        let rewrite = VersionRewriter::new(self.vcs, self.files).rewrite_and_commit(
            ws,
            &config.project.files_with_version,
            &plan.old_version,
            &plan.new_version,
            &message,
        )?;
        report.version_committed = rewrite.committed;
        if rewrite.committed {
            done(format!("Committed: {}", message));
        } else {
            skip("Version already up to date; nothing to commit");
        }

        let deprecated = find_deprecated_files(
            self.files,
            &ws.join(&config.deprecation.directory),
            &config.deprecation.extension,
            &config.deprecation.marker,
            &plan.new_version,
        )?;
        if !deprecated.is_empty() {
            return Err(ReleaseError::DeprecationPresent {
                version: plan.new_version.to_string(),
                files: deprecated,
            });
        }
        done(format!("No deprecations scheduled for {}", plan.new_version));

        if self.dry_run {
            info!("Dry run, stopping before push");
            return Ok(report);
        }

        self.vcs.push(ws, target.remote, &branch.title)?;
        let number = self
            .hosting
            .create_pull_request(&plan.pull_request_title(), &branch.title, target.stable)
            .await?;
        report.pull_request = Some(number);
        done(format!("Opened pull request #{}", number));

        let poller = CheckPoller::new(
            self.hosting,
            self.sleeper,
            config.checks.initial_delay,
            config.checks.poll_interval,
        );
        match poller.wait_for_branch(&branch.title).await? {
            CheckOutcome::Passed { sha, polls, waited } => {
                done(format!(
                    "Checks passed on {} after {} poll(s), {}s",
                    sha,
                    polls,
                    waited.num_seconds()
                ));
                report.head_sha = Some(sha);
            }
            CheckOutcome::Failed { sha, failed } => {
                return Err(ReleaseError::ChecksFailed { sha, failed });
            }
        }

        self.hosting.merge_pull_request(&branch.title).await?;
        done(format!("Merged pull request #{}", number));

        self.hosting.create_release(&plan.tag, &plan.tag).await?;
        report.tag = Some(plan.tag.clone());
        done(format!("Published release {}", plan.tag));

        match regenerate_release_notes(self.hosting, &plan.tag, &config.bot_markers).await? {
            Some(_) => done("Release notes grouped by label"),
            None => skip("Release notes have no sections to group"),
        }

        report.docs = self.update_docs(plan).await?;

        back_merge_stable(self.vcs, ws, &target)?;
        done(format!(
            "Merged {} back into {} and pushed",
            target.stable, target.integration
        ));

        Ok(report)
    }

    async fn update_docs(&self, plan: &ReleasePlan) -> Result<Option<DocsUpdate>, ReleaseError> {
        let Some(repository) = self.config.docs.repository.as_ref() else {
            skip("No documentation repository configured");
            return Ok(None);
        };
        let Some(hosting) = self.docs_hosting else {
            warn!(repository = %repository, "No client for the documentation repository");
            skip(format!("Documentation update for {}", repository));
            return Ok(None);
        };

        let scratch_dir = tempfile::tempdir().map_err(|source| FileStoreError::WriteFailed {
            path: std::env::temp_dir(),
            source,
        })?;
        let scratch = WorkspaceHandle::new(scratch_dir.path().join(&repository.name));

        let target = DocsTarget {
            repository,
            hosting,
            extension: &self.config.docs.extension,
            remote: &self.config.branches.remote,
            base: &self.config.docs.base,
        };
        let update = propagate_version(
            self.vcs,
            self.files,
            &target,
            &scratch,
            &self.config.project.name,
            &plan.old_version,
            &plan.new_version,
        )
        .await?;

        match update.pull_request {
            Some(number) => done(format!("Documentation updated via #{}", number)),
            None => skip("Documentation already mentions the new version"),
        }
        Ok(Some(update))
    }
}
