//! Split GitHub-generated release notes into sections.

/// Prefix of the compare-link line GitHub appends to generated notes.
pub const FULL_CHANGELOG_PREFIX: &str = "**Full Changelog**";

const SECTION_PREFIX: &str = "## ";

/// A `## Title` block and its body lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogSection {
    pub title: String,
    pub lines: Vec<String>,
}

/// Release notes broken into sections, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseNotes {
    pub sections: Vec<ChangelogSection>,
    /// The trailing `**Full Changelog**` line, if the notes ended with one.
    pub full_changelog: Option<String>,
}

impl ReleaseNotes {
    pub fn section(&self, title: &str) -> Option<&ChangelogSection> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn first_section(&self) -> Option<&ChangelogSection> {
        self.sections.first()
    }
}

/// Parse release notes text.
///
/// Anything before the first `## ` header is ignored. Each section body is
/// trimmed as a whole, so blank lines inside it are kept but leading and
/// trailing ones are not.
pub fn parse_release_notes(text: &str) -> ReleaseNotes {
    let mut lines: Vec<&str> = text.trim().lines().collect();

    let full_changelog = match lines.last() {
        Some(last) if last.starts_with(FULL_CHANGELOG_PREFIX) => {
            let line = last.trim().to_string();
            lines.pop();
            Some(line)
        }
        _ => None,
    };

    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in lines {
        if let Some(title) = line.strip_prefix(SECTION_PREFIX) {
            if let Some((title, body)) = current.take() {
                sections.push(finish_section(title, &body));
            }
            current = Some((title.trim().to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((title, body)) = current {
        sections.push(finish_section(title, &body));
    }

    ReleaseNotes {
        sections,
        full_changelog,
    }
}

fn finish_section(title: String, body: &[&str]) -> ChangelogSection {
    let body = body.join("\n");
    let body = body.trim();
    let lines = if body.is_empty() {
        Vec::new()
    } else {
        body.lines().map(str::to_string).collect()
    };
    ChangelogSection { title, lines }
}
