//! Current version discovery from a properties-style file.

use std::path::Path;

use semver::Version;
use tracing::debug;

use crate::error::{ConfigError, FileStoreError};
use crate::files::FileStore;

/// Parse a strict `MAJOR.MINOR.PATCH` version.
///
/// Pre-release and build metadata are rejected, as are leading `v` prefixes.
pub fn parse_version(raw: &str) -> Result<Version, ConfigError> {
    let raw = raw.trim();
    let mut parts = raw.split('.');
    let major = parts.next();
    let minor = parts.next();
    let patch = parts.next();
    let extra = parts.next();

    let numeric = |p: Option<&str>| p.is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

    if extra.is_some() || !numeric(major) || !numeric(minor) || !numeric(patch) {
        return Err(ConfigError::MalformedVersion(raw.to_string()));
    }

    // semver rejects leading zeros and overflow; both are malformed here too
    Version::parse(raw).map_err(|_| ConfigError::MalformedVersion(raw.to_string()))
}

/// Find `key=value` in properties-file content.
pub fn find_property<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find_map(|line| {
        let line = line.trim();
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim())
    })
}

/// Read the current version from `path`, looking up `key`.
pub fn read_current_version<F: FileStore + ?Sized>(
    files: &F,
    path: &Path,
    key: &str,
) -> Result<Version, ConfigError> {
    let content = files.read_to_string(path).map_err(|e| match e {
        FileStoreError::ReadFailed { path, source } => ConfigError::ReadFailed { path, source },
        other => ConfigError::InvalidConfig {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    version_from_properties(&content, key, path)
}

/// Look up `key` in properties `content` read from `path` and parse it.
pub fn version_from_properties(
    content: &str,
    key: &str,
    path: &Path,
) -> Result<Version, ConfigError> {
    let raw = find_property(content, key).ok_or_else(|| ConfigError::MissingVersion {
        key: key.to_string(),
        path: path.to_path_buf(),
    })?;

    let version = parse_version(raw)?;
    debug!(%version, path = %path.display(), "Read current version");
    Ok(version)
}
