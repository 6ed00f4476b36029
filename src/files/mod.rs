//! Whole-file text access and source tree walking.

use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FileStoreError;

/// File access used by the release steps.
///
/// Implementations read and write whole files and enumerate files by
/// extension. Paths are absolute; callers resolve them through a
/// [`WorkspaceHandle`](crate::workspace::WorkspaceHandle).
pub trait FileStore: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, FileStoreError>;

    fn write(&self, path: &Path, content: &str) -> Result<(), FileStoreError>;

    /// All files under `root` whose extension equals `extension`, sorted.
    fn walk_files(&self, root: &Path, extension: &str) -> Result<Vec<PathBuf>, FileStoreError>;
}

/// Local filesystem store.
pub struct LocalFileStore;

/// Directories never worth descending into.
const SKIPPED_DIRS: &[&str] = &[".git", "build", "target", "node_modules", ".gradle"];

impl FileStore for LocalFileStore {
    fn read_to_string(&self, path: &Path) -> Result<String, FileStoreError> {
        std::fs::read_to_string(path).map_err(|source| FileStoreError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Atomic write: a sibling temp file is persisted over the target.
    fn write(&self, path: &Path, content: &str) -> Result<(), FileStoreError> {
        let write_err = |source: std::io::Error| FileStoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    fn walk_files(&self, root: &Path, extension: &str) -> Result<Vec<PathBuf>, FileStoreError> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
        });

        for entry in walker {
            let entry = entry.map_err(|e| FileStoreError::WalkFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

            if entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some(extension)
            {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }
}
