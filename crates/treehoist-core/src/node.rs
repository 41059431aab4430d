//! Identity types: trees, relative paths, digests and observations.

use std::fmt;
use std::path::{Component, Path};

use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier for one of the trees being compared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(pub CompactString);

impl TreeId {
    /// Create a new TreeId from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(CompactString::new(name))
    }

    /// Get the tree name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TreeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TreeId {
    fn from(name: String) -> Self {
        Self(CompactString::from(name))
    }
}

/// A path relative to a tree root, always using `/` separators.
///
/// Ordering is plain lexicographic ordering of the normalized string, which is
/// the order every report lists paths in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a relative path from an already-normalized string.
    ///
    /// Backslashes are converted and leading/trailing separators are dropped.
    pub fn new(path: impl AsRef<str>) -> Self {
        let normalized = path
            .as_ref()
            .split(['/', '\\'])
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    /// Build the relative path of `full` below `root`.
    ///
    /// Returns `None` when `full` is not inside `root`, is the root itself, or
    /// contains a parent (`..`) component.
    pub fn from_paths(root: &Path, full: &Path) -> Option<Self> {
        let stripped = full.strip_prefix(root).ok()?;
        let mut parts = Vec::new();
        for component in stripped.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts.join("/")))
    }

    /// Get the normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this path below a root directory.
    pub fn to_path(&self, root: &Path) -> std::path::PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
    }

    /// The first directory component, or `None` for files at the tree root.
    pub fn top_level(&self) -> Option<&str> {
        self.0.split_once('/').map(|(head, _)| head)
    }

    /// The final component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// BLAKE3 content digest of a file's raw bytes.
///
/// Serialized as a lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Create a new Digest from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the digest as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64 character hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// Abbreviated form for human-readable output.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid digest: {hex}")))
    }
}

/// One file seen in one tree during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObservation {
    /// Tree the file was found in.
    pub tree: TreeId,
    /// Path relative to the tree root.
    pub path: RelativePath,
    /// Content digest.
    pub digest: Digest,
    /// Size in bytes.
    pub size: u64,
}

impl FileObservation {
    /// Create a new observation.
    pub fn new(tree: TreeId, path: RelativePath, digest: Digest, size: u64) -> Self {
        Self {
            tree,
            path,
            digest,
            size,
        }
    }
}
