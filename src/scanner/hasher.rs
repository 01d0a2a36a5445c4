//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! Two operations are provided:
//!
//! - [`Hasher::prehash`] reads up to three [`PREHASH_WINDOW`]-byte windows
//!   (head, middle, tail) and hashes them as one input. It is a cheap
//!   fingerprint used to split same-size candidates before a full read.
//! - [`Hasher::full_hash`] streams the whole file in [`CHUNK_SIZE`] chunks,
//!   checking the shutdown flag between chunks.
//!
//! The middle window is taken at `size / 2` only when `size > 2 * PREHASH_WINDOW`,
//! the tail window at `size - PREHASH_WINDOW` only when `size > 3 * PREHASH_WINDOW`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::HashError;

/// A 256-bit BLAKE3 digest.
pub type Hash = [u8; 32];

/// Size of each prehash window in bytes.
pub const PREHASH_WINDOW: usize = 4096;

/// Read size used when streaming a full hash.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex representation of a hash.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}

/// Parse a 64-character hex string back into a hash.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    blake3::Hash::from_hex(hex).ok().map(|h| *h.as_bytes())
}

/// File hasher shared across the hashing thread pool.
#[derive(Debug, Default)]
pub struct Hasher {
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Hasher {
    /// Create a hasher with no shutdown flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort long full-hash reads when `flag` becomes `true`.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Three-window fingerprint of the file at `path`.
    ///
    /// The size used for window placement is taken from the open file, so a
    /// file that changed since the walk is fingerprinted consistently with
    /// what is on disk now.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn prehash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let mut hasher = blake3::Hasher::new();
        let mut window = vec![0u8; PREHASH_WINDOW];

        for offset in window_offsets(size) {
            let n = read_window(&mut file, offset, &mut window)
                .map_err(|e| HashError::from_io(path, e))?;
            hasher.update(&window[..n]);
        }

        log::trace!("Prehashed {} ({} bytes)", path.display(), size);
        Ok(*hasher.finalize().as_bytes())
    }

    /// Full BLAKE3 hash of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Interrupted`] if the shutdown flag is raised while
    /// reading, or another [`HashError`] on I/O failure.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..n]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Offsets of the windows read for a file of `size` bytes.
fn window_offsets(size: u64) -> Vec<u64> {
    let window = PREHASH_WINDOW as u64;
    let mut offsets = vec![0];
    if size > 2 * window {
        offsets.push(size / 2);
    }
    if size > 3 * window {
        offsets.push(size - window);
    }
    offsets
}

/// Fill `buf` from `offset`, stopping early only at end of file.
fn read_window(file: &mut File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    file.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
