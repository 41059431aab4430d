//! Conflicts found while placing files in the shared tree.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use treehoist_core::{Digest, RelativePath};

/// A destination that cannot take the hoisted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// Path relative to the shared root.
    pub path: RelativePath,
    /// The source file that would have been copied.
    pub source: PathBuf,
    /// The destination where the conflict exists.
    pub destination: PathBuf,
    /// The kind of conflict.
    pub kind: ConflictKind,
    /// Digest of the existing destination, when it is a readable file.
    pub found: Option<Digest>,
}

impl Conflict {
    /// Create a new conflict.
    pub fn new(
        path: RelativePath,
        source: PathBuf,
        destination: PathBuf,
        kind: ConflictKind,
        found: Option<Digest>,
    ) -> Self {
        Self {
            path,
            source,
            destination,
            kind,
            found,
        }
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.destination.display(), self.kind)
    }
}

/// The kind of conflict encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// A file with different content already exists at the destination.
    ContentDiffers,
    /// Something other than a regular file occupies the destination.
    NotAFile,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContentDiffers => write!(f, "File exists with different content"),
            Self::NotAFile => write!(f, "Destination exists and is not a regular file"),
        }
    }
}
