//! JWalk-based tree walker.
//!
//! Produces every regular file below a tree root as a [`RelativePath`],
//! lazily and in a deterministic order (siblings sorted by name). Symbolic
//! links are never followed, so link cycles cannot cause unbounded recursion;
//! they are reported as skipped instead.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use jwalk::{DirEntryIter, Parallelism, WalkDir};

use treehoist_core::{ExcludeRules, RelativePath, ScanError, ScanWarning, TreeId, WarningKind};

/// One item produced by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// A regular file.
    File {
        relative: RelativePath,
        absolute: PathBuf,
    },
    /// A directory that will be descended into.
    Directory { relative: RelativePath },
    /// A symbolic link, not followed.
    Symlink { absolute: PathBuf },
    /// A directory below the root that could not be listed.
    Unreadable(ScanWarning),
}

/// Walks tree roots, applying name-based exclusion rules.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    rules: ExcludeRules,
}

impl TreeWalker {
    /// Create a walker with the given exclusion rules.
    pub fn new(rules: ExcludeRules) -> Self {
        Self { rules }
    }

    /// Start walking `root`.
    ///
    /// Fails when the root does not exist, cannot be listed, or is not a
    /// directory. Problems below the root are yielded as
    /// [`WalkEvent::Unreadable`] and the walk continues.
    pub fn walk(&self, tree: &TreeId, root: &Path) -> Result<Walk, ScanError> {
        let unreadable = |source: std::io::Error| ScanError::TreeUnreadable {
            tree: tree.clone(),
            path: root.to_path_buf(),
            source,
        };

        let root_path = root.canonicalize().map_err(unreadable)?;
        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory {
                tree: tree.clone(),
                path: root_path,
            });
        }
        // Listing the root up front turns an unreadable root into a tree
        // error instead of a single directory warning.
        std::fs::read_dir(&root_path).map_err(unreadable)?;

        let excluded = Arc::new(AtomicU64::new(0));
        let rules = self.rules.clone();
        let counter = Arc::clone(&excluded);

        let inner = WalkDir::new(&root_path)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| {
                    let Ok(entry) = child else { return true };
                    let name = entry.file_name.to_string_lossy();
                    let skip = if entry.file_type.is_dir() {
                        rules.skips_dir(&name)
                    } else if entry.file_type.is_file() {
                        rules.skips_file(&name)
                    } else {
                        false
                    };
                    if skip {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    !skip
                });
            })
            .into_iter();

        Ok(Walk {
            tree: tree.clone(),
            root: root_path,
            inner,
            excluded,
        })
    }
}

/// A lazy walk over one tree.
pub struct Walk {
    tree: TreeId,
    root: PathBuf,
    inner: DirEntryIter<((), ())>,
    excluded: Arc<AtomicU64>,
}

impl Walk {
    /// Canonical root being walked.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of entries dropped by exclusion rules so far.
    pub fn excluded(&self) -> u64 {
        self.excluded.load(Ordering::Relaxed)
    }

    fn unreadable(&self, path: PathBuf, message: String) -> WalkEvent {
        WalkEvent::Unreadable(ScanWarning::new(
            self.tree.clone(),
            path,
            message,
            WarningKind::DirectoryUnreadable,
        ))
    }
}

impl Iterator for Walk {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(self.unreadable(path, err.to_string()));
                }
            };

            let absolute = entry.path();
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                return Some(WalkEvent::Symlink { absolute });
            }

            let Some(relative) = RelativePath::from_paths(&self.root, &absolute) else {
                continue;
            };

            if file_type.is_dir() {
                // jwalk yields a directory it failed to list as a normal entry.
                if let Some(err) = &entry.read_children_error {
                    return Some(self.unreadable(absolute, err.to_string()));
                }
                return Some(WalkEvent::Directory { relative });
            }
            if file_type.is_file() {
                return Some(WalkEvent::File { relative, absolute });
            }
            // Sockets, devices and FIFOs carry no comparable content.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use treehoist_core::{RunConfig, TreeSpec};

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir_all(root.join("assets")).unwrap();
        fs::create_dir_all(root.join("sections")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();

        fs::write(root.join("assets/base.css"), "body {}").unwrap();
        fs::write(root.join("assets/app.js"), "init();").unwrap();
        fs::write(root.join("sections/header.liquid"), "<header>").unwrap();
        fs::write(root.join("README.md"), "readme").unwrap();
        fs::write(root.join(".git/objects/abc"), "blob").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "module").unwrap();

        temp
    }

    fn default_walker() -> TreeWalker {
        let config = RunConfig::new(vec![TreeSpec::new("t", "/unused")]);
        TreeWalker::new(config.exclude_rules().unwrap())
    }

    fn files(walk: Walk) -> Vec<String> {
        walk.filter_map(|event| match event {
            WalkEvent::File { relative, .. } => Some(relative.to_string()),
            _ => None,
        })
        .collect()
    }

    #[test]
    fn test_walk_lists_files_in_sorted_order() {
        let temp = create_test_tree();
        let walk = default_walker().walk(&TreeId::new("t"), temp.path()).unwrap();

        assert_eq!(
            files(walk),
            vec![
                "README.md",
                "assets/app.js",
                "assets/base.css",
                "sections/header.liquid",
            ]
        );
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let temp = create_test_tree();
        let walk = default_walker().walk(&TreeId::new("t"), temp.path()).unwrap();
        let events: Vec<_> = walk.collect();

        assert!(!events.iter().any(|e| matches!(
            e,
            WalkEvent::File { relative, .. } if relative.as_str().starts_with(".git")
                || relative.as_str().starts_with("node_modules")
        )));
    }

    #[test]
    fn test_excluded_count() {
        let temp = create_test_tree();
        let mut walk = default_walker().walk(&TreeId::new("t"), temp.path()).unwrap();
        while walk.next().is_some() {}
        assert_eq!(walk.excluded(), 2);
    }

    #[test]
    fn test_walk_is_deterministic() {
        let temp = create_test_tree();
        let walker = default_walker();
        let first = files(walker.walk(&TreeId::new("t"), temp.path()).unwrap());
        let second = files(walker.walk(&TreeId::new("t"), temp.path()).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_root_is_tree_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let result = default_walker().walk(&TreeId::new("t"), &missing);
        assert!(matches!(result, Err(ScanError::TreeUnreadable { .. })));
    }

    #[test]
    fn test_file_root_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let result = default_walker().walk(&TreeId::new("t"), &file);
        assert!(matches!(result, Err(ScanError::NotADirectory { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_directory_is_reported_and_walk_continues() {
        use std::os::unix::fs::PermissionsExt;

        let temp = create_test_tree();
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.css"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Running with privileges that ignore directory permissions.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let events: Vec<_> = default_walker()
            .walk(&TreeId::new("t"), temp.path())
            .unwrap()
            .collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let unreadable: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WalkEvent::Unreadable(w) => Some(w),
                _ => None,
            })
            .collect();
        assert_eq!(unreadable.len(), 1);
        assert_eq!(unreadable[0].kind, WarningKind::DirectoryUnreadable);
        assert!(unreadable[0].path.ends_with("locked"));

        let files: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WalkEvent::File { relative, .. } => Some(relative.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            files,
            vec![
                "README.md",
                "assets/app.js",
                "assets/base.css",
                "sections/header.liquid",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let temp = create_test_tree();
        let root = temp.path();
        std::os::unix::fs::symlink(root, root.join("sections/loop")).unwrap();

        let walk = default_walker().walk(&TreeId::new("t"), root).unwrap();
        let events: Vec<_> = walk.collect();

        assert!(events.iter().any(|e| matches!(e, WalkEvent::Symlink { .. })));
        let file_count = events
            .iter()
            .filter(|e| matches!(e, WalkEvent::File { .. }))
            .count();
        assert_eq!(file_count, 4);
    }
}
