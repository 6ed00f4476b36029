//! Release notes curation.
//!
//! GitHub generates a flat list of merged pull requests. This module turns it
//! into a changelog grouped by pull request label and writes it back to the
//! release.

pub mod classify;
pub mod parser;
pub mod writer;

use tracing::{info, warn};

use crate::error::GitHubError;
use crate::github::HostingPlatform;

pub use classify::{LabelBuckets, LineClass, arrange_by_labels, classify_line};
pub use parser::{ChangelogSection, ReleaseNotes, parse_release_notes};
pub use writer::render_changelog;

/// Fetch the notes of `tag`, regroup the first section by label and store
/// the result on the release.
///
/// Returns the new body, or `None` when the notes had no sections to work
/// with and were left untouched.
pub async fn regenerate_release_notes<H: HostingPlatform + ?Sized>(
    hosting: &H,
    tag: &str,
    bot_markers: &[String],
) -> Result<Option<String>, GitHubError> {
    let raw = hosting.release_notes(tag).await?;
    let notes = parse_release_notes(&raw);

    let Some(first) = notes.first_section() else {
        warn!(tag, "Release notes have no sections, leaving them as generated");
        return Ok(None);
    };

    let buckets = arrange_by_labels(hosting, &first.lines, bot_markers).await;
    let body = render_changelog(&notes, &buckets);

    hosting.update_release_notes(tag, &body).await?;
    info!(tag, "Release notes regrouped by label");
    Ok(Some(body))
}
