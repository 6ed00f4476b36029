//! Route release-note lines into label buckets.

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, warn};

use crate::github::HostingPlatform;

pub const DEPENDENCY_UPGRADE: &str = "dependency-upgrade";
pub const OTHERS: &str = "others";

static PULL_REQUEST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s]+?/pull/\d+").expect("pull request URL pattern is valid")
});

/// How a single release-note line should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// Authored by a dependency bot; goes to the dependency upgrade bucket.
    Bot,
    /// References a pull request whose labels decide the bucket.
    PullRequest(String),
    /// No pull request reference; not carried into the changelog.
    Unlinked,
}

/// Classify one line. Bot markers win over any URL on the line.
pub fn classify_line(line: &str, bot_markers: &[String]) -> LineClass {
    if bot_markers.iter().any(|marker| line.contains(marker.as_str())) {
        return LineClass::Bot;
    }

    match PULL_REQUEST_URL.find(line) {
        Some(m) => LineClass::PullRequest(m.as_str().to_string()),
        None => LineClass::Unlinked,
    }
}

/// Lines grouped by label, in the order labels were first seen.
///
/// Starts with empty `dependency-upgrade` and `others` buckets. A line with
/// several labels lands in every one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelBuckets {
    buckets: Vec<(String, Vec<String>)>,
}

impl Default for LabelBuckets {
    fn default() -> Self {
        Self {
            buckets: vec![
                (DEPENDENCY_UPGRADE.to_string(), Vec::new()),
                (OTHERS.to_string(), Vec::new()),
            ],
        }
    }
}

impl LabelBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: &str, line: &str) {
        match self.buckets.iter_mut().find(|(name, _)| name == label) {
            Some((_, lines)) => lines.push(line.to_string()),
            None => self
                .buckets
                .push((label.to_string(), vec![line.to_string()])),
        }
    }

    pub fn lines(&self, label: &str) -> &[String] {
        self.buckets
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, lines)| lines.as_slice())
            .unwrap_or(&[])
    }

    /// Labels with their lines, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.buckets
            .iter()
            .map(|(name, lines)| (name.as_str(), lines.as_slice()))
    }
}

/// Sort `lines` into label buckets, looking up each referenced pull
/// request's labels.
///
/// Bot lines are appended to the dependency upgrade bucket after every
/// labelled line. A failed label lookup is logged and the line filed under
/// `others`.
pub async fn arrange_by_labels<H: HostingPlatform + ?Sized>(
    hosting: &H,
    lines: &[String],
    bot_markers: &[String],
) -> LabelBuckets {
    let mut buckets = LabelBuckets::new();
    let mut bot_lines = Vec::new();

    for line in lines {
        match classify_line(line, bot_markers) {
            LineClass::Bot => bot_lines.push(line),
            LineClass::Unlinked => debug!(line = %line, "Dropping line without a pull request"),
            LineClass::PullRequest(url) => match hosting.pull_request_labels(&url).await {
                Ok(labels) if labels.is_empty() => buckets.push(OTHERS, line),
                Ok(labels) => {
                    for label in &labels {
                        buckets.push(label, line);
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Could not fetch pull request labels");
                    buckets.push(OTHERS, line);
                }
            },
        }
    }

    for line in bot_lines {
        buckets.push(DEPENDENCY_UPGRADE, line);
    }

    buckets
}
