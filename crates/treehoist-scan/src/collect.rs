//! Per-tree walk-and-fingerprint worker.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use treehoist_core::{
    FileObservation, ScanError, ScanWarning, TreeId, TreeStats, TreeStatus, WarningKind,
};

use crate::fingerprint::Fingerprint;
use crate::progress::ProgressTracker;
use crate::walker::{TreeWalker, WalkEvent};

/// Everything one worker learned about one tree.
///
/// Built without any shared state; the engine merges it into the index
/// afterwards.
#[derive(Debug, Clone)]
pub struct TreeScan {
    pub id: TreeId,
    pub root: PathBuf,
    pub status: TreeStatus,
    pub stats: TreeStats,
    /// Observations in walk order.
    pub observations: Vec<FileObservation>,
    pub warnings: Vec<ScanWarning>,
}

impl TreeScan {
    fn empty(id: TreeId, root: PathBuf, status: TreeStatus) -> Self {
        Self {
            id,
            root,
            status,
            stats: TreeStats::new(),
            observations: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Walk one tree and fingerprint every file in it.
///
/// Unreadable files become warnings and are left out of the observations.
/// An unreadable root yields an empty scan with [`TreeStatus::Unreadable`].
/// When `cancel` fires no new file is started and the scan is returned with
/// [`TreeStatus::Interrupted`].
pub(crate) fn collect_tree(
    id: &TreeId,
    root: &Path,
    walker: &TreeWalker,
    fingerprinter: &dyn Fingerprint,
    cancel: &CancellationToken,
    mut progress: ProgressTracker,
) -> TreeScan {
    if cancel.is_cancelled() {
        return TreeScan::empty(id.clone(), root.to_path_buf(), TreeStatus::Interrupted);
    }

    let mut walk = match walker.walk(id, root) {
        Ok(walk) => walk,
        Err(err) => {
            tracing::warn!(tree = %id, error = %err, "tree unreadable");
            let mut scan = TreeScan::empty(id.clone(), root.to_path_buf(), TreeStatus::Unreadable);
            scan.warnings.push(ScanWarning::tree_unreadable(&err));
            progress.record_warning();
            progress.finish();
            return scan;
        }
    };

    tracing::debug!(tree = %id, root = %walk.root().display(), "walking tree");
    let mut scan = TreeScan::empty(id.clone(), walk.root().to_path_buf(), TreeStatus::Ok);

    for event in walk.by_ref() {
        if cancel.is_cancelled() {
            let err = ScanError::Interrupted { tree: id.clone() };
            tracing::warn!(tree = %id, "{err}");
            scan.status = TreeStatus::Interrupted;
            break;
        }

        record_event(&mut scan, event, fingerprinter, &mut progress);
    }

    scan.stats.excluded = walk.excluded();
    progress.finish();
    tracing::debug!(
        tree = %id,
        files = scan.stats.files,
        bytes = scan.stats.bytes,
        warnings = scan.warnings.len(),
        "tree done"
    );
    scan
}

/// Fold one walk event into a tree's scan.
fn record_event(
    scan: &mut TreeScan,
    event: WalkEvent,
    fingerprinter: &dyn Fingerprint,
    progress: &mut ProgressTracker,
) {
    let id = scan.id.clone();
    match event {
        WalkEvent::File { relative, absolute } => {
            match fingerprinter.fingerprint(&absolute) {
                Ok((digest, size)) => {
                    scan.stats.record_file(size);
                    progress.record_file(absolute, size);
                    scan.observations.push(FileObservation::new(id, relative, digest, size));
                }
                Err(err) => {
                    tracing::warn!(tree = %id, error = %err, "file unreadable");
                    scan.stats.unreadable_files += 1;
                    scan.warnings.push(ScanWarning::file_unreadable(id.clone(), &err));
                    progress.record_warning();
                }
            }
        }
        WalkEvent::Directory { .. } => scan.stats.record_dir(),
        WalkEvent::Symlink { absolute } => {
            tracing::debug!(tree = %id, path = %absolute.display(), "symlink skipped");
            scan.stats.symlinks_skipped += 1;
            scan.warnings.push(ScanWarning::new(
                id.clone(),
                absolute,
                "Symbolic link not followed",
                WarningKind::SymlinkSkipped,
            ));
        }
        WalkEvent::Unreadable(warning) => {
            tracing::warn!(tree = %id, path = %warning.path.display(), "{}", warning.message);
            scan.warnings.push(warning);
            progress.record_warning();
        }
    }
}
