//! Async hoist into the shared tree with progress reporting.
//!
//! Every plan item is ensured independently: copied when the destination is
//! missing, skipped when it already holds the same bytes, and reported as a
//! conflict when it holds anything else. Existing files are never replaced.

use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use treehoist_core::{Digest, FingerprintError};
use treehoist_scan::Fingerprinter;

use crate::conflict::{Conflict, ConflictKind};
use crate::manifest::HoistManifest;
use crate::operation::{HoistError, HoistItem, HoistPlan, OperationError};
use crate::progress::{HoistComplete, HoistProgress};
use crate::OPERATION_CHANNEL_SIZE;

/// Result sent through the channel during a hoist.
#[derive(Debug)]
pub enum HoistResult {
    /// Progress update.
    Progress(HoistProgress),
    /// A destination holds different content and was left alone.
    Conflict(Conflict),
    /// The hoist finished.
    Complete(HoistComplete),
}

/// Options for a hoist run.
#[derive(Debug, Clone, Default)]
pub struct HoistOptions {
    /// Report what would happen without touching the shared tree.
    pub dry_run: bool,
    /// Stop starting new items once cancelled.
    pub cancel: Option<CancellationToken>,
}

/// What ensuring one item did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    /// The file was copied; carries the bytes written.
    Copied(u64),
    /// The destination already held identical content.
    AlreadyPresent,
    /// Dry run: the file would be copied.
    Planned,
}

/// Make sure one plan item is present in the shared tree.
///
/// The source is streamed into a temporary file next to the destination and
/// hashed on the way; only bytes matching the scanned digest are moved into
/// place. The final rename never replaces an existing file, so a destination
/// appearing mid-copy is reported as a conflict. A failed copy leaves nothing
/// behind.
pub fn ensure_item(
    item: &HoistItem,
    fingerprinter: &Fingerprinter,
    dry_run: bool,
) -> Result<Ensured, HoistError> {
    match fs::symlink_metadata(&item.destination) {
        Ok(meta) if meta.is_file() => {
            let (found, _) = fingerprinter.fingerprint(&item.destination)?;
            if found == item.digest {
                return Ok(Ensured::AlreadyPresent);
            }
            return Err(conflict(item, ConflictKind::ContentDiffers, Some(found)));
        }
        Ok(_) => return Err(conflict(item, ConflictKind::NotAFile, None)),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(HoistError::io(&item.destination, e)),
    }

    if dry_run {
        let (current, _) = fingerprinter.fingerprint(&item.source)?;
        if current != item.digest {
            return Err(HoistError::SourceChanged {
                path: item.source.clone(),
            });
        }
        return Ok(Ensured::Planned);
    }

    let parent = item.destination.parent().ok_or_else(|| {
        HoistError::io(
            &item.destination,
            io::Error::new(ErrorKind::InvalidInput, "destination has no parent directory"),
        )
    })?;
    fs::create_dir_all(parent).map_err(|e| HoistError::io(parent, e))?;

    let source = File::open(&item.source)
        .map_err(|e| HoistError::from(FingerprintError::new(&item.source, e)))?;
    let (staged, digest, bytes) = stage(source, &item.source, parent, fingerprinter)?;
    if digest != item.digest {
        return Err(HoistError::SourceChanged {
            path: item.source.clone(),
        });
    }

    match staged.persist_noclobber(&item.destination) {
        Ok(_) => Ok(Ensured::Copied(bytes)),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            Err(conflict(item, ConflictKind::ContentDiffers, None))
        }
        Err(e) => Err(HoistError::io(&item.destination, e.error)),
    }
}

fn conflict(item: &HoistItem, kind: ConflictKind, found: Option<Digest>) -> HoistError {
    HoistError::Conflict(Box::new(Conflict::new(
        item.path.clone(),
        item.source.clone(),
        item.destination.clone(),
        kind,
        found,
    )))
}

/// Copy `reader` into a new temporary file in `dir`, hashing the bytes written.
///
/// The temporary file is removed on any error, and when the caller drops it.
fn stage(
    reader: impl Read,
    source: &Path,
    dir: &Path,
    fingerprinter: &Fingerprinter,
) -> Result<(NamedTempFile, Digest, u64), HoistError> {
    let staged = NamedTempFile::new_in(dir).map_err(|e| HoistError::io(dir, e))?;
    let (hashed, write_error) = {
        let mut tee = Tee::new(reader, staged.as_file());
        let hashed = fingerprinter.fingerprint_reader(&mut tee);
        (hashed, tee.write_error)
    };
    if let Some(e) = write_error {
        return Err(HoistError::io(staged.path(), e));
    }
    let (digest, bytes) = hashed.map_err(|e| HoistError::from(FingerprintError::new(source, e)))?;
    Ok((staged, digest, bytes))
}

/// Reader that writes every byte it yields into a sink.
struct Tee<R, W> {
    reader: R,
    sink: W,
    write_error: Option<io::Error>,
}

impl<R, W> Tee<R, W> {
    fn new(reader: R, sink: W) -> Self {
        Self {
            reader,
            sink,
            write_error: None,
        }
    }
}

impl<R: Read, W: Write> Read for Tee<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if let Err(e) = self.sink.write_all(&buf[..n]) {
            let message = e.to_string();
            self.write_error = Some(e);
            return Err(io::Error::other(message));
        }
        Ok(n)
    }
}

/// Start an async hoist.
///
/// Returns a receiver for progress updates, conflicts and the final result.
/// Unless this is a dry run, the manifest under the shared root is updated
/// with every item that ended up in place.
pub fn start_hoist(plan: HoistPlan, options: HoistOptions) -> mpsc::Receiver<HoistResult> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        hoist_impl(plan, options, tx).await;
    });

    rx
}

/// Internal implementation of the hoist.
async fn hoist_impl(plan: HoistPlan, options: HoistOptions, tx: mpsc::Sender<HoistResult>) {
    let mut progress = HoistProgress::new(plan.len(), plan.total_bytes());
    let mut complete = HoistComplete {
        dry_run: options.dry_run,
        ..HoistComplete::default()
    };
    let mut ensured: Vec<HoistItem> = Vec::new();
    let fingerprinter = Fingerprinter::new();

    let total = plan.items.len();
    for (i, item) in plan.items.iter().enumerate() {
        if options.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            complete.cancelled = total - i;
            tracing::warn!(remaining = complete.cancelled, "hoist cancelled");
            break;
        }

        progress.set_current_file(Some(item.source.clone()));
        let _ = tx.send(HoistResult::Progress(progress.clone())).await;

        let task_item = item.clone();
        let task_fingerprinter = fingerprinter.clone();
        let dry_run = options.dry_run;
        let result = tokio::task::spawn_blocking(move || {
            ensure_item(&task_item, &task_fingerprinter, dry_run)
        })
        .await
        .unwrap_or_else(|e| Err(HoistError::Task(e.to_string())));

        match result {
            Ok(Ensured::Copied(bytes)) => {
                tracing::info!(path = %item.path, from = %item.source_tree, bytes, "hoisted");
                complete.copied += 1;
                complete.bytes_copied += bytes;
                progress.complete_file(bytes);
                ensured.push(item.clone());
            }
            Ok(Ensured::AlreadyPresent) => {
                tracing::debug!(path = %item.path, "already present");
                complete.already_present += 1;
                progress.complete_file(0);
                ensured.push(item.clone());
            }
            Ok(Ensured::Planned) => {
                complete.planned += 1;
                progress.complete_file(0);
            }
            Err(HoistError::Conflict(conflict)) => {
                tracing::warn!("{conflict}");
                complete.conflicts += 1;
                progress.complete_file(0);
                let _ = tx.send(HoistResult::Conflict(*conflict)).await;
            }
            Err(err) => {
                tracing::warn!(path = %item.path, error = %err, "hoist failed");
                complete.failed += 1;
                complete
                    .errors
                    .push(OperationError::new(item.source.clone(), err.to_string()));
                progress.complete_file(0);
            }
        }
    }

    if !options.dry_run && !ensured.is_empty() {
        let shared_root = plan.shared_root.clone();
        let written = tokio::task::spawn_blocking(move || -> Result<PathBuf, HoistError> {
            let mut manifest = HoistManifest::load(&shared_root)?;
            for item in &ensured {
                manifest.record(item);
            }
            manifest.save(&shared_root)
        })
        .await
        .unwrap_or_else(|e| Err(HoistError::Task(e.to_string())));

        match written {
            Ok(path) => complete.manifest = Some(path),
            Err(err) => {
                tracing::warn!(error = %err, "manifest not written");
                complete.errors.push(OperationError::new(
                    HoistManifest::path(&plan.shared_root),
                    err.to_string(),
                ));
            }
        }
    }

    let _ = tx.send(HoistResult::Complete(complete)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;
    use treehoist_core::{RelativePath, TreeId};

    fn item(temp: &TempDir, path: &str, body: &str) -> HoistItem {
        let source = temp.path().join("a").join(path);
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, body).unwrap();
        let (digest, _) = Fingerprinter::new().fingerprint(&source).unwrap();
        HoistItem {
            path: RelativePath::new(path),
            source_tree: TreeId::new("a"),
            source,
            destination: temp.path().join("shared").join(path),
            digest,
            size: body.len() as u64,
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_copies_then_noops() {
        let temp = TempDir::new().unwrap();
        let item = item(&temp, "assets/base.css", "body{}");
        let fp = Fingerprinter::new();

        assert_eq!(ensure_item(&item, &fp, false).unwrap(), Ensured::Copied(6));
        assert_eq!(read(&item.destination), "body{}");
        assert_eq!(ensure_item(&item, &fp, false).unwrap(), Ensured::AlreadyPresent);
    }

    #[test]
    fn test_differing_destination_is_conflict_and_untouched() {
        let temp = TempDir::new().unwrap();
        let item = item(&temp, "assets/base.css", "body{}");
        fs::create_dir_all(item.destination.parent().unwrap()).unwrap();
        fs::write(&item.destination, "customized").unwrap();

        let err = ensure_item(&item, &Fingerprinter::new(), false).unwrap_err();
        let conflict = err.conflict().unwrap();
        assert_eq!(conflict.kind, ConflictKind::ContentDiffers);
        assert!(conflict.found.is_some());
        assert_eq!(read(&item.destination), "customized");
    }

    #[test]
    fn test_directory_at_destination_is_conflict() {
        let temp = TempDir::new().unwrap();
        let item = item(&temp, "assets/base.css", "body{}");
        fs::create_dir_all(&item.destination).unwrap();

        let err = ensure_item(&item, &Fingerprinter::new(), false).unwrap_err();
        assert_eq!(err.conflict().unwrap().kind, ConflictKind::NotAFile);
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).map_or(0, |d| d.count())
    }

    #[test]
    fn test_changed_source_is_not_copied() {
        let temp = TempDir::new().unwrap();
        let item = item(&temp, "snippets/x.liquid", "v1");
        fs::write(&item.source, "v2").unwrap();

        let err = ensure_item(&item, &Fingerprinter::new(), false).unwrap_err();
        assert!(matches!(err, HoistError::SourceChanged { .. }));
        assert!(!item.destination.exists());
        assert_eq!(entries(item.destination.parent().unwrap()), 0);
    }

    /// Yields a few bytes, then fails.
    struct BrokenRead {
        sent: bool,
    }

    impl Read for BrokenRead {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::other("device gone"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"body");
            Ok(4)
        }
    }

    /// Accepts nothing.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_interrupted_copy_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let item = item(&temp, "assets/base.css", "body{}");
        let parent = item.destination.parent().unwrap();
        fs::create_dir_all(parent).unwrap();

        let err = stage(
            BrokenRead { sent: false },
            &item.source,
            parent,
            &Fingerprinter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, HoistError::Fingerprint { .. }));
        assert_eq!(entries(parent), 0);

        // The next attempt copies normally instead of reporting a conflict.
        let fp = Fingerprinter::new();
        assert_eq!(ensure_item(&item, &fp, false).unwrap(), Ensured::Copied(6));
        assert_eq!(read(&item.destination), "body{}");
        assert_eq!(entries(parent), 1);
    }

    #[test]
    fn test_tee_keeps_write_error() {
        let mut tee = Tee::new(&b"body{}"[..], FullDisk);
        let err = Fingerprinter::new().fingerprint_reader(&mut tee).unwrap_err();
        assert!(err.to_string().contains("no space left"));
        assert!(tee.write_error.is_some());
    }

    #[test]
    fn test_staged_bytes_are_the_hashed_bytes() {
        let temp = TempDir::new().unwrap();
        let (staged, digest, bytes) = stage(
            &b"{% render 'icon' %}"[..],
            Path::new("/t/a/snippets/icon.liquid"),
            temp.path(),
            &Fingerprinter::new(),
        )
        .unwrap();
        assert_eq!(bytes, 19);
        assert_eq!(Fingerprinter::new().fingerprint(staged.path()).unwrap(), (digest, 19));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let item = item(&temp, "snippets/x.liquid", "v1");

        assert_eq!(ensure_item(&item, &Fingerprinter::new(), true).unwrap(), Ensured::Planned);
        assert!(!temp.path().join("shared").exists());
    }

    async fn drain(mut rx: mpsc::Receiver<HoistResult>) -> (Vec<Conflict>, HoistComplete) {
        let mut conflicts = Vec::new();
        while let Some(result) = rx.recv().await {
            match result {
                HoistResult::Progress(_) => {}
                HoistResult::Conflict(conflict) => conflicts.push(conflict),
                HoistResult::Complete(complete) => return (conflicts, complete),
            }
        }
        panic!("channel closed without completion");
    }

    #[tokio::test]
    async fn test_start_hoist_writes_manifest() {
        let temp = TempDir::new().unwrap();
        let plan = HoistPlan {
            shared_root: temp.path().join("shared"),
            items: vec![
                item(&temp, "assets/a.css", "a"),
                item(&temp, "assets/b.css", "b"),
            ],
        };
        fs::create_dir_all(temp.path().join("shared/assets")).unwrap();
        fs::write(temp.path().join("shared/assets/b.css"), "other").unwrap();

        let (conflicts, complete) = drain(start_hoist(plan, HoistOptions::default())).await;
        assert_eq!(complete.copied, 1);
        assert_eq!(complete.conflicts, 1);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].path, RelativePath::new("assets/b.css"));

        let manifest = HoistManifest::load(&temp.path().join("shared")).unwrap();
        assert_eq!(manifest.entries.len(), 1);
        assert!(manifest.entries.contains_key(&RelativePath::new("assets/a.css")));
    }

    #[tokio::test]
    async fn test_cancelled_hoist_starts_nothing() {
        let temp = TempDir::new().unwrap();
        let plan = HoistPlan {
            shared_root: temp.path().join("shared"),
            items: vec![item(&temp, "assets/a.css", "a")],
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let options = HoistOptions {
            dry_run: false,
            cancel: Some(cancel),
        };
        let (_, complete) = drain(start_hoist(plan, options)).await;
        assert_eq!(complete.cancelled, 1);
        assert!(complete.manifest.is_none());
        assert!(!temp.path().join("shared/assets/a.css").exists());
    }
}
