//! Streaming BLAKE3 content fingerprints.

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;

use blake3::Hasher;

use treehoist_core::{Digest, FingerprintError};

/// Default read buffer size.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Computes content digests by streaming files through BLAKE3.
///
/// Memory use is bounded by the chunk size regardless of file size. BLAKE3 is
/// the only algorithm used; every digest in a run is comparable.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    chunk_size: usize,
}

impl Fingerprinter {
    /// Create a fingerprinter with the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a fingerprinter with a custom chunk size (minimum 1 byte).
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Hash a file, returning its digest and the number of bytes read.
    pub fn fingerprint(&self, path: &Path) -> Result<(Digest, u64), FingerprintError> {
        let file = File::open(path).map_err(|e| FingerprintError::new(path, e))?;
        self.fingerprint_reader(file)
            .map_err(|e| FingerprintError::new(path, e))
    }

    /// Hash everything a reader yields, in `chunk_size` reads.
    pub fn fingerprint_reader(&self, mut reader: impl Read) -> io::Result<(Digest, u64)> {
        let mut hasher = Hasher::new();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total = 0u64;

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..bytes_read]);
            total += bytes_read as u64;
        }

        Ok((Digest::new(*hasher.finalize().as_bytes()), total))
    }
}

/// Anything that can produce a content digest for a file.
pub trait Fingerprint: Send + Sync {
    /// Hash a file, returning its digest and size in bytes.
    fn fingerprint(&self, path: &Path) -> Result<(Digest, u64), FingerprintError>;
}

impl Fingerprint for Fingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<(Digest, u64), FingerprintError> {
        Fingerprinter::fingerprint(self, path)
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
