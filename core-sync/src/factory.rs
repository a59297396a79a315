//! # Record Factory
//!
//! Turns filesystem paths into [`FileRecord`] snapshots relative to the
//! watched root.

use crate::error::{Result, SyncError};
use bridge_traits::storage::{FileRecord, RelativeId, DIRECTORY_EXTENSION};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name prefix of editor lock/temp files (`~$report.docx`)
const TEMP_FILE_PREFIX: &str = "~$";

/// Builds records for entries under a fixed root
#[derive(Debug, Clone)]
pub struct FileRecordFactory {
    root: PathBuf,
    device_id: String,
}

impl FileRecordFactory {
    /// Create a factory for `root`
    ///
    /// The root is canonicalized once. When it does not exist yet the
    /// absolute form is kept so later lookups still compare consistently.
    pub fn new(root: impl AsRef<Path>, device_id: impl Into<String>) -> Self {
        let root = root.as_ref();
        let root = fs::canonicalize(root)
            .or_else(|_| std::path::absolute(root))
            .unwrap_or_else(|_| root.to_path_buf());

        Self {
            root,
            device_id: device_id.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Whether an entry is eligible for sync
    ///
    /// Hidden entries (`.name`) and temp files (`~$name`) are rejected.
    pub fn should_process(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        !(name.starts_with('.') || name.starts_with(TEMP_FILE_PREFIX))
    }

    /// Snapshot the entry at `absolute_path`
    ///
    /// Returns `Ok(None)` when the entry vanished, is not readable, resolves
    /// outside the root, or is the root itself.
    ///
    /// # Errors
    ///
    /// Any other I/O failure is returned as [`SyncError::Io`].
    pub fn create_from_path(&self, absolute_path: &Path) -> Result<Option<FileRecord>> {
        let path = match fs::canonicalize(absolute_path) {
            Ok(path) => path,
            Err(e) => return skip_or_fail(absolute_path, e),
        };

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => return skip_or_fail(&path, e),
        };

        let Some(relative_path) = path
            .strip_prefix(&self.root)
            .ok()
            .and_then(RelativeId::from_path)
        else {
            debug!(path = %path.display(), "Entry is not below the watched root");
            return Ok(None);
        };

        let is_directory = metadata.is_dir();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = if is_directory {
            DIRECTORY_EXTENSION.to_string()
        } else {
            path.extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let last_modified = metadata
            .modified()
            .map(|time| DateTime::<Utc>::from(time).timestamp())
            .unwrap_or(0);

        Ok(Some(FileRecord {
            absolute_path: path,
            relative_path,
            filename,
            extension,
            size_bytes: metadata.len(),
            last_modified,
            device_id: self.device_id.clone(),
            is_directory,
        }))
    }
}

/// Not-found and permission errors are expected while walking a live tree
fn skip_or_fail(path: &Path, error: io::Error) -> Result<Option<FileRecord>> {
    match error.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), error = %error, "Entry not readable, skipping");
            Ok(None)
        }
        _ => Err(SyncError::Io {
            path: path.to_path_buf(),
            source: error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileRecordFactory) {
        let dir = TempDir::new().unwrap();
        let factory = FileRecordFactory::new(dir.path(), "test-device");
        (dir, factory)
    }

    #[test]
    fn test_should_process_filters_hidden_and_temp_names() {
        let (_dir, factory) = setup();

        assert!(factory.should_process(Path::new("/data/notes/todo.txt")));
        assert!(factory.should_process(Path::new("/data/notes")));
        assert!(factory.should_process(Path::new("/data/report~$.docx")));

        assert!(!factory.should_process(Path::new("/data/.git")));
        assert!(!factory.should_process(Path::new("/data/notes/.DS_Store")));
        assert!(!factory.should_process(Path::new("/data/~$report.docx")));
    }

    #[test]
    fn test_create_from_file() {
        let (dir, factory) = setup();
        fs::create_dir(dir.path().join("notes")).unwrap();
        let file = dir.path().join("notes").join("todo.TXT");
        fs::write(&file, b"buy milk").unwrap();

        let record = factory.create_from_path(&file).unwrap().unwrap();

        assert_eq!(record.relative_path.as_str(), "notes/todo.TXT");
        assert_eq!(record.filename, "todo.TXT");
        assert_eq!(record.extension, "TXT");
        assert_eq!(record.size_bytes, 8);
        assert_eq!(record.device_id, "test-device");
        assert!(!record.is_directory);
        assert!(record.last_modified > 0);
        assert!(record.absolute_path.is_absolute());
    }

    #[test]
    fn test_create_from_directory_uses_sentinel_extension() {
        let (dir, factory) = setup();
        let folder = dir.path().join("projects.v2");
        fs::create_dir(&folder).unwrap();

        let record = factory.create_from_path(&folder).unwrap().unwrap();

        assert_eq!(record.relative_path.as_str(), "projects.v2");
        assert_eq!(record.extension, DIRECTORY_EXTENSION);
        assert!(record.is_directory);
    }

    #[test]
    fn test_file_without_extension() {
        let (dir, factory) = setup();
        let file = dir.path().join("Makefile");
        fs::write(&file, b"all:").unwrap();

        let record = factory.create_from_path(&file).unwrap().unwrap();
        assert_eq!(record.extension, "");
    }

    #[test]
    fn test_outside_root_is_absent() {
        let (_dir, factory) = setup();
        let other = TempDir::new().unwrap();
        let file = other.path().join("elsewhere.txt");
        fs::write(&file, b"x").unwrap();

        assert!(factory.create_from_path(&file).unwrap().is_none());
    }

    #[test]
    fn test_root_itself_is_absent() {
        let (dir, factory) = setup();
        assert!(factory.create_from_path(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_vanished_entry_is_absent() {
        let (dir, factory) = setup();
        let missing = dir.path().join("gone.txt");
        assert!(factory.create_from_path(&missing).unwrap().is_none());
    }

    #[test]
    fn test_missing_root_keeps_absolute_form() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("not-mounted");
        let factory = FileRecordFactory::new(&root, "dev");

        assert!(factory.root().is_absolute());
        assert!(factory.root().ends_with("not-mounted"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escaping_root_is_absent() {
        let (dir, factory) = setup();
        let other = TempDir::new().unwrap();
        let target = other.path().join("secret.txt");
        fs::write(&target, b"x").unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(factory.create_from_path(&link).unwrap().is_none());
    }
}
