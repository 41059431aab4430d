//! Error and warning types for a comparison run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::TreeId;

/// Errors that stop one tree from contributing to a run.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Tree root is missing or cannot be read.
    #[error("Tree {tree} is unreadable at {path}: {source}")]
    TreeUnreadable {
        tree: TreeId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tree root exists but is not a directory.
    #[error("Tree {tree} root is not a directory: {path}")]
    NotADirectory { tree: TreeId, path: PathBuf },

    /// Walk was cancelled before it finished.
    #[error("Walk of tree {tree} interrupted")]
    Interrupted { tree: TreeId },
}

impl ScanError {
    /// The tree this error belongs to.
    pub fn tree(&self) -> &TreeId {
        match self {
            Self::TreeUnreadable { tree, .. }
            | Self::NotADirectory { tree, .. }
            | Self::Interrupted { tree } => tree,
        }
    }
}

/// A file could not be opened or fully read while hashing.
#[derive(Debug, Error)]
#[error("Failed to fingerprint {path}: {source}")]
pub struct FingerprintError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl FingerprintError {
    /// Create a fingerprint error with path context.
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Misuse of the cross-tree index.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// `record` was called after the index was frozen.
    #[error("Cannot record {path}: index is frozen")]
    Frozen { path: String },

    /// `freeze` was called twice.
    #[error("Index is already frozen")]
    AlreadyFrozen,
}

/// Invalid run configuration. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No trees supplied")]
    NoTrees,

    #[error("Duplicate tree identifier: {0}")]
    DuplicateTreeId(String),

    #[error("Tree identifier cannot be empty (root {0})")]
    EmptyTreeName(String),

    #[error("Coverage must be in (0, 1], got {0}")]
    InvalidCoverage(String),

    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Fatal errors for a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A tree root could not be walked at all.
    TreeUnreadable,
    /// A single file could not be opened or read.
    FileUnreadable,
    /// A directory below the root could not be listed.
    DirectoryUnreadable,
    /// A symbolic link was skipped rather than followed.
    SymlinkSkipped,
    /// The same relative path was observed twice in one tree.
    DuplicateObservation,
}

impl WarningKind {
    /// Whether this warning means data is missing from the comparison.
    pub fn is_degrading(&self) -> bool {
        matches!(
            self,
            Self::TreeUnreadable | Self::FileUnreadable | Self::DirectoryUnreadable
        )
    }
}

/// Non-fatal warning encountered during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Tree the warning belongs to.
    pub tree: TreeId,
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(
        tree: TreeId,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        kind: WarningKind,
    ) -> Self {
        Self {
            tree,
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for a tree that could not be walked.
    pub fn tree_unreadable(error: &ScanError) -> Self {
        let path = match error {
            ScanError::TreeUnreadable { path, .. } | ScanError::NotADirectory { path, .. } => {
                path.clone()
            }
            ScanError::Interrupted { .. } => PathBuf::new(),
        };
        Self {
            tree: error.tree().clone(),
            path,
            message: error.to_string(),
            kind: WarningKind::TreeUnreadable,
        }
    }

    /// Create a warning for a file that could not be fingerprinted.
    pub fn file_unreadable(tree: TreeId, error: &FingerprintError) -> Self {
        Self {
            tree,
            path: error.path.clone(),
            message: format!("Read error: {}", error.source),
            kind: WarningKind::FileUnreadable,
        }
    }
}
