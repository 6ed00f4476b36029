//! Render the curated changelog that replaces GitHub's generated notes.

use super::classify::{DEPENDENCY_UPGRADE, LabelBuckets, OTHERS};
use super::parser::ReleaseNotes;

/// Empty headings the release manager fills in by hand.
const PREAMBLE: &str = "## What's Changed\n\n\n\n## What’s Next?\n\n\n\n## Complete list of changes:\n\n";

const NEW_CONTRIBUTORS: &str = "New Contributors";

/// Known labels and their headings, in rendering order.
pub const KNOWN_LABELS: [(&str, &str); 8] = [
    ("breaking-api-change", "⚠️ Breaking API Changes"),
    ("bug-fix", "🐛 Bug Fixes"),
    ("improvement", "💡 Improvements"),
    ("documentation", "📕 Documentation"),
    ("CI", "🏗️ CI"),
    ("maintenance", "🏗️ Maintenance"),
    (DEPENDENCY_UPGRADE, "📦 Dependency Upgrade"),
    (OTHERS, "Others"),
];

fn is_known(label: &str) -> bool {
    KNOWN_LABELS.iter().any(|(known, _)| *known == label)
}

fn push_block(out: &mut String, heading: &str, lines: &[String]) {
    out.push_str(heading);
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
}

/// Build the final release body.
///
/// Layout: the preamble, `New Contributors` copied verbatim when present,
/// known label sections in fixed order (empty ones skipped), any other
/// labels in the order they were seen, then the Full Changelog line.
pub fn render_changelog(notes: &ReleaseNotes, buckets: &LabelBuckets) -> String {
    let mut out = String::from(PREAMBLE);

    if let Some(section) = notes.section(NEW_CONTRIBUTORS) {
        push_block(&mut out, &format!("## {}", NEW_CONTRIBUTORS), &section.lines);
    }

    for (label, title) in KNOWN_LABELS {
        let lines = buckets.lines(label);
        if !lines.is_empty() {
            push_block(&mut out, &format!("### {}", title), lines);
        }
    }

    for (label, lines) in buckets.iter().filter(|(label, _)| !is_known(label)) {
        push_block(&mut out, &format!("### {}", label), lines);
    }

    out.push_str(notes.full_changelog.as_deref().unwrap_or_default());
    out.push('\n');
    out
}
