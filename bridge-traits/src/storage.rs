//! Storage Abstractions
//!
//! The local-entry data model and the contract of the remote store that
//! mirrors it.

use async_trait::async_trait;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::Result;

/// Extension sentinel carried by directory records
pub const DIRECTORY_EXTENSION: &str = "DIR";

/// Root-relative path in POSIX form
///
/// This is the stable key used to match local entries to remote rows.
/// Construction normalizes platform separators, so `a\b\c` and `a/b/c`
/// produce the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativeId(String);

impl RelativeId {
    /// Normalize a raw identifier string
    ///
    /// Backslashes become `/`, empty and `.` segments are dropped.
    pub fn new(raw: &str) -> Self {
        let normalized = raw
            .replace('\\', "/")
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    /// Build an identifier from a path that is already relative to the root
    ///
    /// Returns `None` when the path is empty or could escape the root
    /// (absolute, prefixed, or containing `..`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        let id = Self::new(&segments.join("/"));
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identifier of the containing folder, `None` for top-level entries
    pub fn parent(&self) -> Option<RelativeId> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| RelativeId(parent.to_string()))
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Resolve against a root directory
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }
}

impl fmt::Display for RelativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RelativeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RelativeId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Immutable snapshot of one local file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Canonical absolute path
    pub absolute_path: PathBuf,
    /// Identifier relative to the watched root
    pub relative_path: RelativeId,
    pub filename: String,
    /// Extension without the leading dot, empty when absent,
    /// [`DIRECTORY_EXTENSION`] for directories
    pub extension: String,
    pub size_bytes: u64,
    /// Last modification time (Unix seconds)
    pub last_modified: i64,
    pub device_id: String,
    pub is_directory: bool,
}

impl FileRecord {
    pub fn identifier(&self) -> &RelativeId {
        &self.relative_path
    }
}

/// Result of writing one record to the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was created
    Created { row_id: String },
    /// An existing row was rewritten
    Updated { row_id: String },
    /// Every write attempt was rejected; the failure has been logged
    Failed { reason: String },
}

impl UpsertOutcome {
    pub fn row_id(&self) -> Option<&str> {
        match self {
            UpsertOutcome::Created { row_id } | UpsertOutcome::Updated { row_id } => Some(row_id),
            UpsertOutcome::Failed { .. } => None,
        }
    }
}

/// Remote table mirroring the local tree
///
/// Implementations own an identifier → row-id cache, so every method takes
/// `&mut self`. Remote failures are logged and degraded inside the
/// implementation; an `Err` means something the caller cannot recover from.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileRepository;
///
/// async fn reconcile(repo: &mut dyn FileRepository, record: &FileRecord) -> Result<()> {
///     let remote = repo.get_all_active_files().await?;
///     repo.upsert_file(record).await?;
///     for id in remote.keys().filter(|id| *id != record.identifier()) {
///         repo.mark_as_missing(id).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileRepository: Send {
    /// Fetch every non-archived row keyed by identifier
    ///
    /// Replaces the internal cache with the returned mapping.
    async fn get_all_active_files(&mut self) -> Result<HashMap<RelativeId, String>>;

    /// Create or update the row for `record`, materializing missing parent
    /// folders first
    async fn upsert_file(&mut self, record: &FileRecord) -> Result<UpsertOutcome>;

    /// Archive the row for `identifier`
    ///
    /// Returns `true` when a row was archived, `false` when there was nothing
    /// to archive or the remote store rejected the update.
    async fn mark_as_missing(&mut self, identifier: &RelativeId) -> Result<bool>;

    /// Re-key the row of `old_identifier` to `record`, or upsert `record` when
    /// no such row exists
    async fn move_file(
        &mut self,
        old_identifier: &RelativeId,
        record: &FileRecord,
    ) -> Result<UpsertOutcome>;
}
