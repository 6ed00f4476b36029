//! Release configuration.
//!
//! Defaults describe the Konsist project layout. An optional TOML file
//! overrides them, and `CONDUCTOR_POLL_INTERVAL` overrides the check poll
//! interval last.
//!
//! ```toml
//! [project]
//! name = "Konsist"
//! version_file = "gradle.properties"
//! version_key = "konsist.version"
//! files_with_version = ["gradle.properties", "README.md"]
//!
//! [branches]
//! integration = "develop"
//! stable = "main"
//! remote = "origin"
//!
//! [deprecation]
//! directory = "lib/src/main/kotlin"
//! extension = "kt"
//! marker = '@Deprecated("'
//!
//! [checks]
//! poll_interval_secs = 60
//! initial_delay_secs = 30
//!
//! [changelog]
//! bot_markers = ["by @renovate"]
//!
//! [docs]
//! repository = "LemonAppDev/konsist-documentation"
//! extension = "md"
//! base = "main"
//!
//! [github]
//! repository = "LemonAppDev/konsist"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use toml_edit::{DocumentMut, Item};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::github::RepoSlug;

/// File name looked up in the workspace root when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "conductor.toml";

/// Environment variable overriding `[checks] poll_interval_secs`.
pub const POLL_INTERVAL_ENV_VAR: &str = "CONDUCTOR_POLL_INTERVAL";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_INITIAL_DELAY_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Display name, used in commit messages and pull request titles.
    pub name: String,
    pub version_file: PathBuf,
    pub version_key: String,
    /// Files whose occurrences of the old version are replaced.
    pub files_with_version: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchConfig {
    pub integration: String,
    pub stable: String,
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationConfig {
    pub directory: PathBuf,
    pub extension: String,
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    pub poll_interval: Duration,
    pub initial_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsConfig {
    /// Documentation repository; `None` skips propagation.
    pub repository: Option<RepoSlug>,
    pub extension: String,
    /// Default branch of the documentation repository.
    pub base: String,
}

/// Everything a release run can be tuned with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
    pub project: ProjectConfig,
    pub branches: BranchConfig,
    pub deprecation: DeprecationConfig,
    pub checks: CheckConfig,
    pub bot_markers: Vec<String>,
    pub docs: DocsConfig,
    /// Repository being released; derived from the remote when unset.
    pub repository: Option<RepoSlug>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "Konsist".to_string(),
                version_file: PathBuf::from("gradle.properties"),
                version_key: "konsist.version".to_string(),
                files_with_version: vec![
                    PathBuf::from("gradle.properties"),
                    PathBuf::from("README.md"),
                ],
            },
            branches: BranchConfig {
                integration: "develop".to_string(),
                stable: "main".to_string(),
                remote: "origin".to_string(),
            },
            deprecation: DeprecationConfig {
                directory: PathBuf::from("lib/src/main/kotlin/com/lemonappdev/konsist/api"),
                extension: "kt".to_string(),
                marker: "@Deprecated(\"".to_string(),
            },
            checks: CheckConfig {
                poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
                initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS),
            },
            bot_markers: vec!["by @renovate".to_string()],
            docs: DocsConfig {
                repository: Some(RepoSlug::new("LemonAppDev", "konsist-documentation")),
                extension: "md".to_string(),
                base: "main".to_string(),
            },
            repository: None,
        }
    }
}

impl ReleaseConfig {
    /// Load configuration for the workspace at `root`.
    ///
    /// An explicit `path` must exist. Without one, `conductor.toml` in `root`
    /// is used when present and the defaults otherwise.
    pub fn load(root: &Path, path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(&root.join(path))?,
            None => {
                let candidate = root.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        config.apply_env();
        Ok(config)
    }

    /// Defaults overridden by the TOML file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &content)
    }

    /// Defaults overridden by TOML `content`. `path` is only used in errors.
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let doc = content
            .parse::<DocumentMut>()
            .map_err(|e| invalid(path, format!("Invalid TOML: {}", e)))?;
        let reader = TomlReader { path, doc: &doc };
        let mut config = Self::default();

        if let Some(v) = reader.string("project", "name")? {
            config.project.name = v;
        }
        if let Some(v) = reader.string("project", "version_file")? {
            config.project.version_file = PathBuf::from(v);
        }
        if let Some(v) = reader.string("project", "version_key")? {
            config.project.version_key = v;
        }
        if let Some(v) = reader.strings("project", "files_with_version")? {
            config.project.files_with_version = v.into_iter().map(PathBuf::from).collect();
        }

        if let Some(v) = reader.string("branches", "integration")? {
            config.branches.integration = v;
        }
        if let Some(v) = reader.string("branches", "stable")? {
            config.branches.stable = v;
        }
        if let Some(v) = reader.string("branches", "remote")? {
            config.branches.remote = v;
        }

        if let Some(v) = reader.string("deprecation", "directory")? {
            config.deprecation.directory = PathBuf::from(v);
        }
        if let Some(v) = reader.string("deprecation", "extension")? {
            config.deprecation.extension = v;
        }
        if let Some(v) = reader.string("deprecation", "marker")? {
            config.deprecation.marker = v;
        }

        if let Some(v) = reader.seconds("checks", "poll_interval_secs")? {
            config.checks.poll_interval = v;
        }
        if let Some(v) = reader.seconds("checks", "initial_delay_secs")? {
            config.checks.initial_delay = v;
        }

        if let Some(v) = reader.strings("changelog", "bot_markers")? {
            config.bot_markers = v;
        }

        if let Some(v) = reader.string("docs", "repository")? {
            config.docs.repository = if v.trim().is_empty() {
                None
            } else {
                Some(reader.slug("docs", "repository", &v)?)
            };
        }
        if let Some(v) = reader.string("docs", "extension")? {
            config.docs.extension = v;
        }
        if let Some(v) = reader.string("docs", "base")? {
            config.docs.base = v;
        }

        if let Some(v) = reader.string("github", "repository")? {
            config.repository = Some(reader.slug("github", "repository", &v)?);
        }

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply environment overrides. Invalid values are logged and ignored.
    pub fn apply_env(&mut self) {
        match env::var(POLL_INTERVAL_ENV_VAR) {
            Ok(v) if !v.is_empty() => match v.parse::<u64>() {
                Ok(secs) => self.checks.poll_interval = Duration::from_secs(secs),
                Err(_) => warn!(
                    "Invalid {} value '{}', using {}s",
                    POLL_INTERVAL_ENV_VAR,
                    v,
                    self.checks.poll_interval.as_secs()
                ),
            },
            _ => {}
        }
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidConfig {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Typed lookups of `[table] key` with errors naming the offending key.
struct TomlReader<'a> {
    path: &'a Path,
    doc: &'a DocumentMut,
}

impl TomlReader<'_> {
    fn item(&self, table: &str, key: &str) -> Option<&Item> {
        self.doc.get(table).and_then(|t| t.get(key))
    }

    fn string(&self, table: &str, key: &str) -> Result<Option<String>, ConfigError> {
        match self.item(table, key) {
            None => Ok(None),
            Some(item) => item
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| invalid(self.path, format!("[{}] {} must be a string", table, key))),
        }
    }

    fn strings(&self, table: &str, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        let Some(item) = self.item(table, key) else {
            return Ok(None);
        };
        let err = || invalid(self.path, format!("[{}] {} must be an array of strings", table, key));

        let array = item.as_array().ok_or_else(err)?;
        array
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(err))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn seconds(&self, table: &str, key: &str) -> Result<Option<Duration>, ConfigError> {
        match self.item(table, key) {
            None => Ok(None),
            Some(item) => match item.as_integer() {
                Some(secs) if secs >= 0 => Ok(Some(Duration::from_secs(secs as u64))),
                _ => Err(invalid(
                    self.path,
                    format!("[{}] {} must be a non-negative integer", table, key),
                )),
            },
        }
    }

    fn slug(&self, table: &str, key: &str, raw: &str) -> Result<RepoSlug, ConfigError> {
        raw.parse().map_err(|_| {
            invalid(
                self.path,
                format!("[{}] {} must look like owner/name, got '{}'", table, key, raw),
            )
        })
    }
}
