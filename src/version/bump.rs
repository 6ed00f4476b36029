//! Semver calculation from the chosen release kind.

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::error::ConfigError;

/// Kind of release being cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// Main release from the integration branch.
    Minor,
    /// Hotfix release.
    Patch,
}

impl ReleaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseKind::Minor => "minor",
            ReleaseKind::Patch => "patch",
        }
    }

    /// Label shown in the interactive selection.
    pub fn description(&self) -> &'static str {
        match self {
            ReleaseKind::Minor => "Main Release - Upgrade Minor",
            ReleaseKind::Patch => "Hotfix Release - Upgrade Patch",
        }
    }
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseKind {
    type Err = ConfigError;

    /// Accepts the kind names and the option numbers of the interactive menu.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minor" | "1" => Ok(ReleaseKind::Minor),
            "patch" | "2" => Ok(ReleaseKind::Patch),
            _ => Err(ConfigError::UnknownReleaseKind(s.to_string())),
        }
    }
}

/// Calculate the next version for a release kind.
///
/// - Minor: `major.(minor+1).0`
/// - Patch: `major.minor.(patch+1)`
pub fn calculate_next_version(current: &Version, kind: ReleaseKind) -> Version {
    match kind {
        ReleaseKind::Minor => Version::new(current.major, current.minor + 1, 0),
        ReleaseKind::Patch => Version::new(current.major, current.minor, current.patch + 1),
    }
}
