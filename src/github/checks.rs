//! CI check-run polling.
//!
//! A release may only be merged once every check on the branch tip has
//! passed. [`CheckPoller`] resolves the tip SHA once and then re-queries the
//! check runs until they settle. Each poll is reduced to an
//! [`AggregateCheckState`]:
//!
//! - any failed run fails the whole set, immediately
//! - otherwise any queued, running or skipped run keeps it pending
//! - otherwise every scored run succeeded
//!
//! Runs with a conclusion that is neither of the above are logged and
//! ignored. A tip with no check runs at all has nothing to wait for and
//! passes; the initial delay gives CI time to register its runs first.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use crate::error::{GitHubError, ReleaseError};

use super::HostingPlatform;
use super::retry::retry_with_backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One entry of the GitHub check-runs API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckRun {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: CheckStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conclusion: CheckConclusion,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunScore {
    Passed,
    Failed,
    Waiting,
}

impl CheckRun {
    pub fn new(name: impl Into<String>, status: CheckStatus, conclusion: CheckConclusion) -> Self {
        Self {
            name: name.into(),
            status,
            conclusion,
        }
    }

    fn score(&self) -> Option<RunScore> {
        match (self.conclusion, self.status) {
            (CheckConclusion::Success, _) => Some(RunScore::Passed),
            (CheckConclusion::Failure, _) => Some(RunScore::Failed),
            (_, CheckStatus::Queued | CheckStatus::InProgress) => Some(RunScore::Waiting),
            (CheckConclusion::Neutral, _) => Some(RunScore::Waiting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateCheckState {
    Failed,
    Pending,
    AllPassed,
}

/// Reduce one poll's runs to a single state.
pub fn aggregate(runs: &[CheckRun]) -> AggregateCheckState {
    let mut pending = false;
    for run in runs {
        match run.score() {
            Some(RunScore::Failed) => return AggregateCheckState::Failed,
            Some(RunScore::Waiting) => pending = true,
            Some(RunScore::Passed) => {}
            None => debug!(
                check = %run.name,
                status = ?run.status,
                conclusion = ?run.conclusion,
                "Ignoring check run with unrecognised state"
            ),
        }
    }

    if pending {
        AggregateCheckState::Pending
    } else {
        AggregateCheckState::AllPassed
    }
}

/// What one poll observed.
#[derive(Debug, Clone)]
pub struct CheckSnapshot {
    pub state: AggregateCheckState,
    pub runs: Vec<CheckRun>,
}

impl CheckSnapshot {
    fn take(runs: Vec<CheckRun>) -> Self {
        Self {
            state: aggregate(&runs),
            runs,
        }
    }

    fn failed_names(&self) -> Vec<String> {
        self.runs
            .iter()
            .filter(|run| run.score() == Some(RunScore::Failed))
            .map(|run| run.name.clone())
            .collect()
    }
}

/// Terminal result of polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed {
        sha: String,
        polls: u32,
        /// From the SHA lookup to the passing poll, initial delay included.
        waited: TimeDelta,
    },
    Failed { sha: String, failed: Vec<String> },
}

/// Pause between polls. Injected so tests do not wait on the clock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polls the check runs of a branch tip until they pass or fail.
pub struct CheckPoller<'a, H: ?Sized, S: ?Sized> {
    hosting: &'a H,
    sleeper: &'a S,
    initial_delay: Duration,
    interval: Duration,
}

impl<'a, H, S> CheckPoller<'a, H, S>
where
    H: HostingPlatform + ?Sized,
    S: Sleeper + ?Sized,
{
    pub fn new(hosting: &'a H, sleeper: &'a S, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            hosting,
            sleeper,
            initial_delay,
            interval,
        }
    }

    /// Wait until the checks on the tip of `branch` settle.
    ///
    /// The SHA is resolved once; commits pushed while polling are not
    /// followed.
    pub async fn wait_for_branch(&self, branch: &str) -> Result<CheckOutcome, ReleaseError> {
        let sha = match self.hosting.latest_commit_sha(branch).await {
            Ok(Some(sha)) => sha,
            Ok(None) => {
                return Err(ReleaseError::UnresolvableCommit {
                    branch: branch.to_string(),
                });
            }
            Err(e) => {
                warn!(branch, error = %e, "Failed to resolve latest commit");
                return Err(ReleaseError::UnresolvableCommit {
                    branch: branch.to_string(),
                });
            }
        };
        info!(branch, sha = %sha, "Waiting for checks");
        let started = Utc::now();

        if !self.initial_delay.is_zero() {
            self.sleeper.sleep(self.initial_delay).await;
        }

        let mut polls = 0;
        loop {
            polls += 1;
            let runs = retry_with_backoff(
                || self.hosting.check_runs(&sha),
                GitHubError::is_transient,
                |e| GitHubError::RetriesExhausted(Box::new(e)),
            )
            .await?;

            let snapshot = CheckSnapshot::take(runs);
            debug!(
                sha = %sha,
                poll = polls,
                runs = snapshot.runs.len(),
                state = ?snapshot.state,
                "Polled check runs"
            );

            match snapshot.state {
                AggregateCheckState::Failed => {
                    let failed = snapshot.failed_names();
                    warn!(sha = %sha, failed = ?failed, "Checks failed");
                    return Ok(CheckOutcome::Failed { sha, failed });
                }
                AggregateCheckState::AllPassed => {
                    let waited = Utc::now() - started;
                    info!(sha = %sha, polls, waited_secs = waited.num_seconds(), "All checks passed");
                    return Ok(CheckOutcome::Passed { sha, polls, waited });
                }
                AggregateCheckState::Pending => {
                    info!(
                        sha = %sha,
                        retry_in_secs = self.interval.as_secs(),
                        "Checks still running"
                    );
                    self.sleeper.sleep(self.interval).await;
                }
            }
        }
    }
}
