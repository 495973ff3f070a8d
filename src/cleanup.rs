//! Scratch directory lifecycle.
//!
//! Uploads and generated images only live for one server session.
//! [`ScratchDirs`] creates both directories at startup, purging whatever a
//! previous session left behind, and purges them again on
//! [`ScratchDirs::release`] (or on drop if release was never called).

use crate::error::AssistantError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of one purge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
}

impl CleanupReport {
    fn merge(&mut self, other: CleanupReport) {
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

/// Guard over the upload and temp directories.
#[derive(Debug)]
pub struct ScratchDirs {
    dirs: Vec<PathBuf>,
    released: bool,
}

impl ScratchDirs {
    /// Create the directories and purge stale files.
    pub fn acquire(upload_dir: &Path, temp_dir: &Path) -> Result<Self, AssistantError> {
        let dirs = vec![upload_dir.to_path_buf(), temp_dir.to_path_buf()];
        for dir in &dirs {
            std::fs::create_dir_all(dir).map_err(|source| AssistantError::StorageFailed {
                path: dir.clone(),
                source,
            })?;
        }
        let guard = Self {
            dirs,
            released: false,
        };
        let stale = guard.purge();
        if stale.deleted > 0 || stale.failed > 0 {
            info!(
                "Removed {} stale file(s) from a previous session ({} failed)",
                stale.deleted, stale.failed
            );
        }
        Ok(guard)
    }

    /// Delete every file in both directories and disarm the guard.
    pub fn release(mut self) -> CleanupReport {
        self.released = true;
        info!("Cleaning up files...");
        let report = self.purge();
        info!(
            "Cleanup complete: {} deleted, {} failed",
            report.deleted, report.failed
        );
        report
    }

    fn purge(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for dir in &self.dirs {
            report.merge(purge_dir(dir));
        }
        report
    }
}

impl Drop for ScratchDirs {
    fn drop(&mut self) {
        if !self.released {
            let report = self.purge();
            debug!(
                "Scratch guard dropped: {} deleted, {} failed",
                report.deleted, report.failed
            );
        }
    }
}

/// Delete the regular files directly inside `dir`. Subdirectories are left alone.
pub fn purge_dir(dir: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if dir.exists() {
                warn!("Could not list {}: {}", dir.display(), e);
                report.failed += 1;
            }
            return report;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted: {}", path.display());
                report.deleted += 1;
            }
            Err(e) => {
                warn!("Error deleting file {}: {}", path.display(), e);
                report.failed += 1;
            }
        }
    }
    report
}
