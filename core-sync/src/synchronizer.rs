//! # Synchronizer
//!
//! Runs one full pass of the local tree against the remote table.
//!
//! ## Workflow
//!
//! 1. Fetch every active remote row (primes the repository cache)
//! 2. Walk the watched directory, parents before children, upserting each
//!    eligible entry
//! 3. Archive every remote row whose identifier was not seen locally
//!
//! Per-entry failures are logged and counted; they never abort the pass.
//! Failures of the fetch or archive phases are returned to the caller.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{FileRecordFactory, Synchronizer};
//!
//! let factory = FileRecordFactory::new("/data", "DockerWorker");
//! let mut synchronizer = Synchronizer::new(Box::new(repository), factory, "/data");
//! let report = synchronizer.sync().await?;
//! println!("archived {} rows", report.archived);
//! ```

use crate::error::{Result, SyncError};
use crate::factory::FileRecordFactory;
use bridge_traits::storage::{FileRepository, RelativeId, UpsertOutcome};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

/// Counters for one sync pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Active rows found in the remote table at the start of the pass
    pub remote_rows: usize,
    /// Entries whose identifier was recorded as present locally
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    /// Entries rejected by the filter or the factory
    pub skipped: usize,
    /// Entries whose write failed
    pub failed: usize,
    pub archived: usize,
}

impl SyncReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            remote_rows: 0,
            processed: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            archived: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        self.finished_at - self.started_at
    }
}

/// One-way mirror of a directory tree into a [`FileRepository`]
pub struct Synchronizer {
    repository: Box<dyn FileRepository>,
    factory: FileRecordFactory,
    watch_dir: PathBuf,
}

impl Synchronizer {
    pub fn new(
        repository: Box<dyn FileRepository>,
        factory: FileRecordFactory,
        watch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            factory,
            watch_dir: watch_dir.into(),
        }
    }

    /// Run one pass: fetch, walk, reconcile
    ///
    /// # Errors
    ///
    /// Returns an error when the remote snapshot cannot be fetched, the root
    /// cannot be read, or archiving fails in a way the repository could not
    /// absorb.
    #[instrument(skip(self), fields(watch_dir = %self.watch_dir.display()))]
    pub async fn sync(&mut self) -> Result<SyncReport> {
        let mut report = SyncReport::start();
        info!("Starting sync");

        // Phase 1: remote snapshot
        let remote = self.repository.get_all_active_files().await?;
        report.remote_rows = remote.len();
        info!("Found {} active rows in remote table", remote.len());

        // Phase 2: local walk
        let seen = self.walk(&mut report).await?;
        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "Local walk finished"
        );

        // Phase 3: archive rows missing locally
        let mut missing: Vec<&RelativeId> =
            remote.keys().filter(|id| !seen.contains(*id)).collect();
        missing.sort();

        for identifier in missing {
            warn!(identifier = %identifier, "Entry missing locally, archiving");
            if self.repository.mark_as_missing(identifier).await? {
                report.archived += 1;
            }
        }

        report.finished_at = Utc::now();
        info!(
            created = report.created,
            updated = report.updated,
            archived = report.archived,
            duration_ms = report.duration().num_milliseconds(),
            "Sync complete"
        );

        Ok(report)
    }

    async fn walk(&mut self, report: &mut SyncReport) -> Result<HashSet<RelativeId>> {
        let mut seen = HashSet::new();

        if !self.watch_dir.exists() {
            warn!(
                watch_dir = %self.watch_dir.display(),
                "Watch directory does not exist, nothing to walk"
            );
            return Ok(seen);
        }

        let Self {
            repository,
            factory,
            watch_dir,
        } = self;
        let factory: &FileRecordFactory = factory;
        let watch_dir: &Path = watch_dir;

        let walker = WalkDir::new(watch_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(SyncError::Walk(format!(
                        "Cannot read {}: {}",
                        watch_dir.display(),
                        e
                    )));
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !factory.should_process(entry.path()) {
                debug!(path = %entry.path().display(), "Filtered out");
                report.skipped += 1;
                continue;
            }

            if let Some(identifier) =
                process_entry(&mut **repository, factory, entry.path(), report).await
            {
                seen.insert(identifier);
            }
        }

        Ok(seen)
    }
}

/// Upsert one entry, returning its identifier when it counts as present
async fn process_entry(
    repository: &mut dyn FileRepository,
    factory: &FileRecordFactory,
    path: &Path,
    report: &mut SyncReport,
) -> Option<RelativeId> {
    let record = match factory.create_from_path(path) {
        Ok(Some(record)) => record,
        Ok(None) => {
            report.skipped += 1;
            return None;
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read entry");
            report.failed += 1;
            return None;
        }
    };

    match repository.upsert_file(&record).await {
        Ok(outcome) => {
            match &outcome {
                UpsertOutcome::Created { .. } => report.created += 1,
                UpsertOutcome::Updated { .. } => report.updated += 1,
                UpsertOutcome::Failed { reason } => {
                    warn!(identifier = %record.identifier(), reason = %reason, "Write rejected");
                    report.failed += 1;
                }
            }
            // A rejected write still marks the entry present so its row survives
            report.processed += 1;
            Some(record.identifier().clone())
        }
        Err(e) => {
            error!(identifier = %record.identifier(), error = %e, "Failed to process entry");
            report.failed += 1;
            None
        }
    }
}
