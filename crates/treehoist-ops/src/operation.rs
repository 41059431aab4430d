//! Hoist plan and error types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use treehoist_analyze::Report;
use treehoist_core::{Digest, FingerprintError, RelativePath, TreeId};

use crate::conflict::Conflict;

/// One file to place in the shared tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoistItem {
    pub path: RelativePath,
    /// Tree the content is copied from.
    pub source_tree: TreeId,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Digest recorded when the trees were scanned.
    pub digest: Digest,
    pub size: u64,
}

/// Every file a hoist run will ensure under the shared root, in path order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoistPlan {
    pub shared_root: PathBuf,
    pub items: Vec<HoistItem>,
}

impl HoistPlan {
    /// Plan the copy of every copyable entry in a report.
    ///
    /// Content comes from the first tree in roster order that holds the path.
    pub fn from_report(report: &Report, shared_root: impl Into<PathBuf>) -> Self {
        let shared_root = shared_root.into();
        let items = report
            .hoist_candidates()
            .filter_map(|(path, entry)| {
                let source_tree = entry.present_in.first()?;
                let group = entry.digest_groups.first()?;
                let root = report
                    .roster
                    .iter()
                    .find(|t| &t.id == source_tree)
                    .map(|t| t.root.as_path())?;
                Some(HoistItem {
                    path: path.clone(),
                    source_tree: source_tree.clone(),
                    source: path.to_path(root),
                    destination: path.to_path(&shared_root),
                    digest: group.digest,
                    size: group.size,
                })
            })
            .collect();

        Self { shared_root, items }
    }

    /// Number of files in the plan.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if there is nothing to hoist.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total bytes the plan would copy if nothing is present yet.
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|i| i.size).sum()
    }
}

/// Errors from ensuring one hoisted file.
#[derive(Debug, Error)]
pub enum HoistError {
    /// The destination is occupied by other content; it is never overwritten.
    #[error("conflict at {0}")]
    Conflict(Box<Conflict>),

    /// The source no longer matches the scanned digest.
    #[error("source {} changed since it was scanned", path.display())]
    SourceChanged { path: PathBuf },

    #[error("could not read {}: {source}", path.display())]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {} is not valid: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("hoist task failed: {0}")]
    Task(String),
}

impl HoistError {
    /// The conflict behind this error, if it is one.
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            Self::Conflict(conflict) => Some(&**conflict),
            _ => None,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<FingerprintError> for HoistError {
    fn from(err: FingerprintError) -> Self {
        Self::Fingerprint {
            path: err.path,
            source: err.source,
        }
    }
}

/// A failure recorded for one path during a hoist run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
