//! `HOIST_MANIFEST.json`: what has been hoisted into a shared tree.
//!
//! Entries are keyed by relative path and carry no timestamps, so re-running
//! an identical hoist rewrites the same bytes. Entries from earlier runs are
//! kept; those paths are subtracted from later comparisons and would
//! otherwise drop out of the manifest.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use treehoist_core::{Digest, RelativePath, TreeId, HOIST_MANIFEST};

use crate::operation::{HoistError, HoistItem};

/// Manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Where one hoisted file came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub source_tree: TreeId,
    pub digest: Digest,
    pub size: u64,
}

/// Record of every file placed in a shared tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoistManifest {
    pub version: u32,
    pub entries: BTreeMap<RelativePath, ManifestEntry>,
}

impl Default for HoistManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl HoistManifest {
    /// Location of the manifest under a shared root.
    pub fn path(shared_root: &Path) -> PathBuf {
        shared_root.join(HOIST_MANIFEST)
    }

    /// Load the manifest from a shared root; a missing file is an empty manifest.
    pub fn load(shared_root: &Path) -> Result<Self, HoistError> {
        let path = Self::path(shared_root);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(HoistError::io(&path, e)),
        };
        serde_json::from_str(&text).map_err(|source| HoistError::Manifest { path, source })
    }

    /// Record an item as present in the shared tree.
    pub fn record(&mut self, item: &HoistItem) {
        self.entries.insert(
            item.path.clone(),
            ManifestEntry {
                source_tree: item.source_tree.clone(),
                digest: item.digest,
                size: item.size,
            },
        );
    }

    /// Write the manifest under a shared root, returning its path.
    pub fn save(&self, shared_root: &Path) -> Result<PathBuf, HoistError> {
        let path = Self::path(shared_root);
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|source| HoistError::Manifest {
                path: path.clone(),
                source,
            })?;
        json.push('\n');
        fs::create_dir_all(shared_root).map_err(|e| HoistError::io(shared_root, e))?;
        fs::write(&path, json).map_err(|e| HoistError::io(&path, e))?;
        Ok(path)
    }
}
