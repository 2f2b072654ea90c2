//! Content fingerprinting using seeded xxHash64

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::{xxh64, Xxh64};

/// Seed used for all snapshot fingerprints
pub const DEFAULT_SEED: u64 = 0;

/// Read buffer for streaming hash computation
pub const HASH_BUFFER_SIZE: usize = 81920;

/// A 64-bit non-cryptographic content fingerprint
///
/// Collisions are possible; the diff logic always combines the hash with
/// file size (and mtime where available) before treating two files as the
/// same content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(u64);

impl ContentHash {
    /// Hash arbitrary bytes
    #[must_use]
    pub fn from_bytes(data: &[u8], seed: u64) -> Self {
        Self(xxh64(data, seed))
    }

    /// Hash a byte stream, reading sequentially through a fixed buffer
    ///
    /// # Errors
    /// Returns an error if the reader fails.
    pub fn from_reader(mut reader: impl Read, seed: u64) -> io::Result<Self> {
        let mut hasher = Xxh64::new(seed);
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(hasher.digest()))
    }

    /// Hash a file by path
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub fn from_file(path: &Path, seed: u64) -> io::Result<Self> {
        Self::from_reader(File::open(path)?, seed)
    }

    /// Reconstruct from a raw fingerprint value
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw fingerprint value
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:016x})", self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
