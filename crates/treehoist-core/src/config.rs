//! Run configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::node::TreeId;
use crate::tree::Roster;
use crate::HOIST_MANIFEST;

/// Directory names skipped by default.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[".git", "node_modules"];

/// One tree in the roster: an identifier and the directory it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSpec {
    /// Tree identifier used in every report.
    pub id: TreeId,
    /// Root directory of the tree.
    pub root: PathBuf,
}

impl TreeSpec {
    /// Create a new tree spec.
    pub fn new(id: impl Into<TreeId>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
        }
    }

    /// Parse `NAME=PATH`, or a bare `PATH` named after its final component.
    pub fn parse(arg: &str) -> Result<Self, ConfigError> {
        if let Some((name, root)) = arg.split_once('=') {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyTreeName(root.to_string()));
            }
            return Ok(Self::new(TreeId::new(name.trim()), root));
        }
        let root = PathBuf::from(arg);
        let name = tree_name_for(&root).ok_or_else(|| ConfigError::EmptyTreeName(arg.to_string()))?;
        Ok(Self::new(TreeId::new(name), root))
    }
}

/// Derive a tree name from the last component of its root.
fn tree_name_for(root: &Path) -> Option<String> {
    root.components()
        .next_back()
        .and_then(|c| match c {
            std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .filter(|name| !name.is_empty())
}

/// Configuration for one comparison run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct RunConfig {
    /// Ordered roster of trees to compare.
    #[serde(default)]
    pub trees: Vec<TreeSpec>,

    /// Tree holding files that are already shared; its paths are subtracted
    /// from the candidates.
    #[builder(default)]
    #[serde(default)]
    pub shared: Option<PathBuf>,

    /// Directory-name glob patterns to skip while walking.
    #[builder(default = "default_exclude_dirs()")]
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// File-name glob patterns to skip while walking.
    #[builder(default = "default_exclude_files()")]
    #[serde(default = "default_exclude_files")]
    pub exclude_files: Vec<String>,

    /// Fraction of the roster a content group must cover to be hoisted.
    #[builder(default = "0.8")]
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f64,

    /// Byte difference from the median size that counts as material.
    #[builder(default = "1000")]
    #[serde(default = "default_size_delta_threshold")]
    pub size_delta_threshold: u64,

    /// Number of worker threads (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Read buffer size used while hashing.
    #[builder(default = "64 * 1024")]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Paths always reported on, whatever their classification.
    #[builder(default)]
    #[serde(default)]
    pub watch_paths: Vec<String>,
}

fn default_exclude_dirs() -> Vec<String> {
    DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect()
}

fn default_exclude_files() -> Vec<String> {
    vec![HOIST_MANIFEST.to_string()]
}

fn default_min_coverage() -> f64 {
    0.8
}

fn default_size_delta_threshold() -> u64 {
    1000
}

fn default_chunk_size() -> usize {
    64 * 1024
}

impl RunConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let trees = self.trees.as_deref().unwrap_or_default();
        check_trees(trees).map_err(|e| e.to_string())?;
        if let Some(coverage) = self.min_coverage {
            check_coverage(coverage).map_err(|e| e.to_string())?;
        }
        if let Some(patterns) = &self.exclude_dirs {
            compile(patterns).map_err(|e| e.to_string())?;
        }
        if let Some(patterns) = &self.exclude_files {
            compile(patterns).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl RunConfig {
    /// Create a new run config builder.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Create a config for the given trees with default settings.
    pub fn new(trees: Vec<TreeSpec>) -> Self {
        Self {
            trees,
            shared: None,
            exclude_dirs: default_exclude_dirs(),
            exclude_files: default_exclude_files(),
            min_coverage: default_min_coverage(),
            size_delta_threshold: default_size_delta_threshold(),
            threads: 0,
            chunk_size: default_chunk_size(),
            watch_paths: Vec::new(),
        }
    }

    /// Check the config for errors that must abort the run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_trees(&self.trees)?;
        check_coverage(self.min_coverage)?;
        self.exclude_rules()?;
        Ok(())
    }

    /// Build the ordered roster.
    pub fn roster(&self) -> Result<Roster, ConfigError> {
        Roster::from_specs(&self.trees)
    }

    /// Compile the exclusion patterns.
    pub fn exclude_rules(&self) -> Result<ExcludeRules, ConfigError> {
        Ok(ExcludeRules {
            dirs: compile(&self.exclude_dirs)?,
            files: compile(&self.exclude_files)?,
        })
    }
}

fn check_trees(trees: &[TreeSpec]) -> Result<(), ConfigError> {
    if trees.is_empty() {
        return Err(ConfigError::NoTrees);
    }
    Roster::from_specs(trees).map(|_| ())
}

fn check_coverage(coverage: f64) -> Result<(), ConfigError> {
    if coverage.is_nan() || coverage <= 0.0 || coverage > 1.0 {
        return Err(ConfigError::InvalidCoverage(coverage.to_string()));
    }
    Ok(())
}

fn compile(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidPattern {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}

/// Compiled name-based exclusion predicate.
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    dirs: GlobSet,
    files: GlobSet,
}

impl ExcludeRules {
    /// Rules that exclude nothing.
    pub fn none() -> Self {
        Self {
            dirs: GlobSet::empty(),
            files: GlobSet::empty(),
        }
    }

    /// Check whether a directory with this name is skipped, with its subtree.
    pub fn skips_dir(&self, name: &str) -> bool {
        self.dirs.is_match(name)
    }

    /// Check whether a file with this name is skipped.
    pub fn skips_file(&self, name: &str) -> bool {
        self.files.is_match(name)
    }
}
