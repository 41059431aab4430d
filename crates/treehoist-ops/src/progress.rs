//! Progress reporting types for hoist runs.

use std::path::PathBuf;

use crate::operation::OperationError;

/// Progress information for an ongoing hoist.
#[derive(Debug, Clone)]
pub struct HoistProgress {
    /// Number of plan items processed.
    pub files_completed: usize,
    /// Total number of plan items.
    pub files_total: usize,
    /// Number of bytes copied so far.
    pub bytes_processed: u64,
    /// Total bytes in the plan.
    pub bytes_total: u64,
    /// The file currently being processed.
    pub current_file: Option<PathBuf>,
}

impl HoistProgress {
    /// Create a new progress tracker.
    pub fn new(files_total: usize, bytes_total: u64) -> Self {
        Self {
            files_completed: 0,
            files_total,
            bytes_processed: 0,
            bytes_total,
            current_file: None,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.files_total > 0 {
            (self.files_completed as f64 / self.files_total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Update the current file being processed.
    pub fn set_current_file(&mut self, path: Option<PathBuf>) {
        self.current_file = path;
    }

    /// Increment the completed count and add bytes.
    pub fn complete_file(&mut self, bytes: u64) {
        self.files_completed += 1;
        self.bytes_processed += bytes;
    }
}

/// Result of a finished hoist run.
#[derive(Debug, Clone, Default)]
pub struct HoistComplete {
    /// Files copied into the shared tree.
    pub copied: usize,
    /// Files already present with identical content.
    pub already_present: usize,
    /// Files a dry run would copy.
    pub planned: usize,
    /// Destinations left untouched because their content differs.
    pub conflicts: usize,
    /// Files that failed for other reasons.
    pub failed: usize,
    /// Plan items not started because the run was cancelled.
    pub cancelled: usize,
    /// Bytes written.
    pub bytes_copied: u64,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Manifest written at the end, if any.
    pub manifest: Option<PathBuf>,
    /// Errors that occurred.
    pub errors: Vec<OperationError>,
}

impl HoistComplete {
    /// Check if every planned file ended up in place.
    pub fn is_success(&self) -> bool {
        self.conflicts == 0 && self.failed == 0 && self.cancelled == 0
    }

    /// Get a human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut summary = if self.dry_run {
            format!(
                "Would copy {} files, {} already present",
                self.planned, self.already_present
            )
        } else {
            format!(
                "Copied {} files, {} already present",
                self.copied, self.already_present
            )
        };
        if self.conflicts > 0 {
            summary.push_str(&format!(", {} conflicts", self.conflicts));
        }
        if self.failed > 0 {
            summary.push_str(&format!(", {} failed", self.failed));
        }
        if self.cancelled > 0 {
            summary.push_str(&format!(", {} cancelled", self.cancelled));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let mut progress = HoistProgress::new(4, 400);
        assert_eq!(progress.percentage(), 0.0);
        progress.complete_file(100);
        assert_eq!(progress.percentage(), 25.0);
        assert_eq!(progress.bytes_processed, 100);
        assert_eq!(HoistProgress::new(0, 0).percentage(), 0.0);
    }

    #[test]
    fn test_summary() {
        let complete = HoistComplete {
            copied: 3,
            already_present: 2,
            conflicts: 1,
            ..HoistComplete::default()
        };
        assert_eq!(complete.summary(), "Copied 3 files, 2 already present, 1 conflicts");
        assert!(!complete.is_success());

        let dry = HoistComplete {
            planned: 4,
            dry_run: true,
            ..HoistComplete::default()
        };
        assert_eq!(dry.summary(), "Would copy 4 files, 0 already present");
        assert!(dry.is_success());
    }
}
