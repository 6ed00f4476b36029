//! Deprecation gate.
//!
//! Declarations deprecated "for removal in X" must be gone before X ships.
//! The gate scans sources for a deprecation marker followed, on the same
//! line, by the exact version being released.

use std::path::{Path, PathBuf};

use semver::Version;
use tracing::{debug, info};

use crate::error::FileStoreError;
use crate::files::FileStore;

/// Whether `line` carries `marker` and, after it, the version token.
///
/// The version must stand alone: `1.5.0` does not match inside `11.5.0`,
/// `1.5.01` or `1.5.0.1`. A trailing sentence dot (`in 1.5.0.`) is fine.
pub fn line_mentions_deprecation(line: &str, marker: &str, version: &str) -> bool {
    let Some(marker_at) = line.find(marker) else {
        return false;
    };
    let rest = &line[marker_at + marker.len()..];

    rest.match_indices(version).any(|(at, _)| {
        let before = rest[..at].chars().next_back();
        let mut after = rest[at + version.len()..].chars();
        let next = after.next();

        let boundary_before = !before.is_some_and(|c| c.is_ascii_digit() || c == '.');
        let boundary_after = match next {
            None => true,
            Some(c) if c.is_ascii_digit() => false,
            Some('.') => !after.next().is_some_and(|c| c.is_ascii_digit()),
            Some(_) => true,
        };
        boundary_before && boundary_after
    })
}

/// Files under `root` with the given extension that still deprecate
/// something for `version`.
pub fn find_deprecated_files<F: FileStore + ?Sized>(
    files: &F,
    root: &Path,
    extension: &str,
    marker: &str,
    version: &Version,
) -> Result<Vec<PathBuf>, FileStoreError> {
    let version = version.to_string();
    let candidates = files.walk_files(root, extension)?;
    debug!(root = %root.display(), count = candidates.len(), "Scanning for deprecations");

    let mut hits = Vec::new();
    for path in candidates {
        let content = files.read_to_string(&path)?;
        if content
            .lines()
            .any(|line| line_mentions_deprecation(line, marker, &version))
        {
            info!(path = %path.display(), %version, "Deprecated declaration scheduled for this release");
            hits.push(path);
        }
    }

    Ok(hits)
}

/// Terminal hyperlink (OSC 8) to a local file, shown as the path itself.
pub fn file_hyperlink(path: &Path) -> String {
    let url = format!("file://{}", path.display());
    format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, path.display())
}
