//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use conductor::error::{GitHubError, VcsError};
use conductor::git::Vcs;
use conductor::github::{CheckConclusion, CheckRun, CheckStatus, HostingPlatform, Sleeper};
use conductor::workspace::WorkspaceHandle;

/// Get the path to test fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Read a release notes fixture.
pub fn release_notes_fixture(name: &str) -> String {
    let path = fixtures_dir().join("release_notes").join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {:?}: {}", path, e))
}

pub fn passed(name: &str) -> CheckRun {
    CheckRun::new(name, CheckStatus::Completed, CheckConclusion::Success)
}

pub fn failed(name: &str) -> CheckRun {
    CheckRun::new(name, CheckStatus::Completed, CheckConclusion::Failure)
}

pub fn queued(name: &str) -> CheckRun {
    CheckRun::new(name, CheckStatus::Queued, CheckConclusion::Unknown)
}

/// A Konsist-like project checkout in a temp directory. Not a git repo; pair
/// it with [`RecordingVcs`].
pub struct ProjectDir {
    pub dir: tempfile::TempDir,
}

impl ProjectDir {
    pub fn new(version: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let project = Self { dir };
        project.write(
            "gradle.properties",
            &format!("kotlin.code.style=official\nkonsist.version={}\n", version),
        );
        project.write(
            "README.md",
            &format!("testImplementation(\"com.lemonappdev:konsist:{}\")\n", version),
        );
        project.write(
            "lib/src/main/kotlin/com/lemonappdev/konsist/api/Konsist.kt",
            "object Konsist\n",
        );
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn ws(&self) -> WorkspaceHandle {
        WorkspaceHandle::new(self.dir.path())
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative)).expect("Failed to read file")
    }
}

/// [`Vcs`] that records calls instead of running git.
#[derive(Default)]
pub struct RecordingVcs {
    pub dirty: bool,
    pub branches: Mutex<BTreeSet<String>>,
    /// Branches reported for any remote by `remote_branches`.
    pub remote: BTreeSet<String>,
    /// Files written into the destination of `clone_repository`.
    pub clone_contents: Vec<(String, String)>,
    /// Committed content returned by `show_file`, keyed by path. Paths not
    /// listed are read from the working tree.
    pub committed_files: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn with_branches(branches: &[&str]) -> Self {
        Self {
            branches: Mutex::new(branches.iter().map(|b| b.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with_clone_contents(mut self, files: &[(&str, &str)]) -> Self {
        self.clone_contents = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect();
        self
    }

    pub fn with_remote_branches(mut self, branches: &[&str]) -> Self {
        self.remote = branches.iter().map(|b| b.to_string()).collect();
        self
    }

    /// Serve `content` for `path` at every revision, whatever the working
    /// tree holds.
    pub fn with_committed_file(mut self, path: &str, content: &str) -> Self {
        self.committed_files
            .insert(path.to_string(), content.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Vcs for RecordingVcs {
    fn is_dirty(&self, _ws: &WorkspaceHandle) -> Result<bool, VcsError> {
        self.record("is_dirty".into());
        Ok(self.dirty)
    }

    fn checkout(&self, _ws: &WorkspaceHandle, branch: &str) -> Result<(), VcsError> {
        self.record(format!("checkout {}", branch));
        Ok(())
    }

    fn create_branch(&self, _ws: &WorkspaceHandle, name: &str) -> Result<(), VcsError> {
        self.branches.lock().unwrap().insert(name.to_string());
        self.record(format!("create_branch {}", name));
        Ok(())
    }

    fn fetch(&self, _ws: &WorkspaceHandle) -> Result<(), VcsError> {
        self.record("fetch".into());
        Ok(())
    }

    fn pull(&self, _ws: &WorkspaceHandle) -> Result<(), VcsError> {
        self.record("pull".into());
        Ok(())
    }

    fn merge(&self, _ws: &WorkspaceHandle, branch: &str) -> Result<(), VcsError> {
        self.record(format!("merge {}", branch));
        Ok(())
    }

    fn stage(&self, ws: &WorkspaceHandle, paths: &[PathBuf]) -> Result<(), VcsError> {
        let names: Vec<String> = paths
            .iter()
            .map(|p| ws.relative(p).display().to_string())
            .collect();
        self.record(format!("stage {}", names.join(" ")));
        Ok(())
    }

    fn commit(&self, _ws: &WorkspaceHandle, message: &str) -> Result<(), VcsError> {
        self.record(format!("commit {}", message));
        Ok(())
    }

    fn push(&self, _ws: &WorkspaceHandle, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.record(format!("push {} {}", remote, branch));
        Ok(())
    }

    fn list_branches(&self, _ws: &WorkspaceHandle) -> Result<BTreeSet<String>, VcsError> {
        self.record("list_branches".into());
        Ok(self.branches.lock().unwrap().clone())
    }

    fn remote_branches(
        &self,
        _ws: &WorkspaceHandle,
        remote: &str,
    ) -> Result<BTreeSet<String>, VcsError> {
        self.record(format!("remote_branches {}", remote));
        Ok(self.remote.clone())
    }

    fn show_file(&self, ws: &WorkspaceHandle, rev: &str, path: &Path) -> Result<String, VcsError> {
        self.record(format!("show {}:{}", rev, path.display()));
        let key = path.display().to_string();
        if let Some(content) = self.committed_files.get(&key) {
            return Ok(content.clone());
        }
        std::fs::read_to_string(ws.join(path)).map_err(|e| VcsError::FileAtRevision {
            rev: rev.to_string(),
            path: path.to_path_buf(),
            source: git2::Error::from_str(&e.to_string()),
        })
    }

    fn clone_repository(&self, url: &str, dest: &WorkspaceHandle) -> Result<(), VcsError> {
        std::fs::create_dir_all(dest.root()).expect("Failed to create clone dir");
        for (relative, content) in &self.clone_contents {
            let path = dest.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
            }
            std::fs::write(path, content).expect("Failed to write cloned file");
        }
        self.record(format!("clone {}", url));
        Ok(())
    }
}

/// In-memory GitHub with scripted check runs and labels.
pub struct FakeHosting {
    pub sha: Option<String>,
    pub labels: HashMap<String, Vec<String>>,
    /// Body GitHub "generates" when a release is created.
    pub generated_notes: String,
    check_polls: Mutex<VecDeque<Vec<CheckRun>>>,
    release_body: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeHosting {
    pub fn new(polls: Vec<Vec<CheckRun>>) -> Self {
        Self {
            sha: Some("abc123".to_string()),
            labels: HashMap::new(),
            generated_notes: String::new(),
            check_polls: Mutex::new(polls.into()),
            release_body: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_label(mut self, url: &str, labels: &[&str]) -> Self {
        self.labels
            .insert(url.to_string(), labels.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_generated_notes(mut self, notes: impl Into<String>) -> Self {
        self.generated_notes = notes.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn release_body(&self) -> Option<String> {
        self.release_body.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostingPlatform for FakeHosting {
    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
    ) -> Result<u64, GitHubError> {
        self.record(format!("create_pull_request {} {} -> {}", title, head, base));
        Ok(42)
    }

    async fn merge_pull_request(&self, branch: &str) -> Result<(), GitHubError> {
        self.record(format!("merge_pull_request {}", branch));
        Ok(())
    }

    async fn latest_commit_sha(&self, branch: &str) -> Result<Option<String>, GitHubError> {
        self.record(format!("latest_commit_sha {}", branch));
        Ok(self.sha.clone())
    }

    async fn check_runs(&self, sha: &str) -> Result<Vec<CheckRun>, GitHubError> {
        self.record(format!("check_runs {}", sha));
        let mut polls = self.check_polls.lock().unwrap();
        // The last scripted poll repeats once the script runs out
        match polls.len() {
            0 => Ok(Vec::new()),
            1 => Ok(polls[0].clone()),
            _ => Ok(polls.pop_front().unwrap_or_default()),
        }
    }

    async fn pull_request_labels(&self, url: &str) -> Result<Vec<String>, GitHubError> {
        self.record(format!("pull_request_labels {}", url));
        self.labels
            .get(url)
            .cloned()
            .ok_or_else(|| GitHubError::PullRequestNotFound(url.to_string()))
    }

    async fn create_release(&self, tag: &str, title: &str) -> Result<(), GitHubError> {
        self.record(format!("create_release {} {}", tag, title));
        let mut body = self.release_body.lock().unwrap();
        if body.is_none() {
            *body = Some(self.generated_notes.clone());
        }
        Ok(())
    }

    async fn release_notes(&self, tag: &str) -> Result<String, GitHubError> {
        self.record(format!("release_notes {}", tag));
        self.release_body()
            .ok_or_else(|| GitHubError::ReleaseNotFound(tag.to_string()))
    }

    async fn update_release_notes(&self, tag: &str, body: &str) -> Result<(), GitHubError> {
        self.record(format!("update_release_notes {}", tag));
        *self.release_body.lock().unwrap() = Some(body.to_string());
        Ok(())
    }
}

/// [`Sleeper`] that returns at once and remembers what it was asked.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            // The git CLI refuses to commit without an identity
            let mut config = repo.config().expect("Failed to open repo config");
            config.set_str("user.name", "Test User").expect("Failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Failed to set user.email");
        }
        Self { dir, repo }
    }

    pub fn ws(&self) -> WorkspaceHandle {
        WorkspaceHandle::new(self.dir.path())
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write `relative` and commit it. Returns the commit OID.
    pub fn commit_file(&self, relative: &str, content: &str, message: &str) -> Oid {
        let sig = self.signature();

        let file_path = self.dir.path().join(relative);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");

        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(relative)).expect("Failed to add file");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Create a branch pointing to the given OID.
    pub fn branch(&self, name: &str, oid: Oid) {
        let commit = self.repo.find_commit(oid).expect("Failed to find commit");
        self.repo.branch(name, &commit, false).expect("Failed to create branch");
    }

    /// Run the git CLI in the repository, panicking on failure.
    pub fn git(&self, args: &[&str]) -> String {
        run_git_in(self.dir.path(), args)
    }

    /// Create a bare repository and register it as `origin`. Keep the
    /// returned directory alive for as long as the remote is used.
    pub fn add_bare_origin(&self) -> tempfile::TempDir {
        let remote = tempfile::tempdir().expect("Failed to create remote directory");
        run_git_in(remote.path(), &["init", "--bare", "--quiet"]);
        let url = remote.path().to_str().expect("Non UTF-8 temp path");
        self.git(&["remote", "add", "origin", url]);
        remote
    }

    /// Name of the branch HEAD points at.
    pub fn head_branch(&self) -> String {
        self.repo
            .head()
            .ok()
            .and_then(|h| h.shorthand().map(String::from))
            .expect("HEAD is not a branch")
    }

    /// Commit message of HEAD.
    pub fn head_message(&self) -> String {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map(|c| c.message().unwrap_or_default().to_string())
            .expect("Failed to read HEAD commit")
    }
}

fn run_git_in(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}
