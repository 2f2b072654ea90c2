//! Chunked concurrent file scanning

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Result, SnapshotError};
use crate::hash::{ContentHash, DEFAULT_SEED};

/// Number of files hashed concurrently before the scanner moves on
pub const CHUNK_SIZE: usize = 50;

/// Metadata for a single file at scan time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute, normalized file path
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last-write time, sub-second precision
    pub modified: SystemTime,
    /// Content fingerprint
    pub hash: ContentHash,
}

impl FileEntry {
    /// Stat and hash one file
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, stat-ed, or read.
    pub fn read(path: &Path, seed: u64) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let metadata = file.metadata()?;
        let hash = ContentHash::from_reader(&file, seed)?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified()?,
            hash,
        })
    }
}

/// Scanner for directory trees
///
/// Enumerates every regular file under the root lazily, hashing in
/// fixed-size chunks: files within a chunk run concurrently, chunks run in
/// sequence. Peak open file handles and in-flight hash computations are
/// bounded by the chunk size.
pub struct Scanner {
    root: PathBuf,
    chunk_size: usize,
    seed: u64,
}

impl Scanner {
    /// Create a new scanner for the given root directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: CHUNK_SIZE,
            seed: DEFAULT_SEED,
        }
    }

    /// Override the chunk size
    ///
    /// A performance knob: the resulting entry set is identical for any
    /// chunk size.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Override the fingerprint seed
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Scan the tree and return one entry per readable regular file
    ///
    /// Individual files that cannot be opened, stat-ed, or read are logged
    /// and excluded from the result; they never abort the scan. A file that
    /// disappears mid-scan is indistinguishable from one that was never
    /// there.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Scan`] if the root itself is not a
    /// scannable directory.
    pub async fn scan(&self) -> Result<Vec<FileEntry>> {
        let metadata = std::fs::metadata(&self.root).map_err(|source| SnapshotError::Scan {
            path: self.root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(SnapshotError::Scan {
                path: self.root.clone(),
                source: io::Error::other("not a directory"),
            });
        }

        let mut walker = WalkDir::new(&self.root).follow_links(false).into_iter();
        let mut entries = Vec::new();

        loop {
            let chunk = next_file_paths(&mut walker, self.chunk_size);
            if chunk.is_empty() {
                break;
            }

            let tasks: Vec<_> = chunk
                .into_iter()
                .map(|path| {
                    let seed = self.seed;
                    tokio::task::spawn_blocking(move || {
                        let entry = FileEntry::read(&path, seed);
                        (path, entry)
                    })
                })
                .collect();

            // The whole chunk joins before the next one starts.
            for task in tasks {
                match task.await {
                    Ok((_, Ok(entry))) => entries.push(entry),
                    Ok((path, Err(err))) => {
                        warn!(path = %path.display(), error = %err, "skipped unreadable file");
                    }
                    Err(err) => warn!(error = %err, "hash task aborted"),
                }
            }
        }

        // Sort for deterministic ordering
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(entries)
    }
}

/// Pull up to `n` regular-file paths from the walker
fn next_file_paths(walker: &mut walkdir::IntoIter, n: usize) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(n);

    while paths.len() < n {
        match walker.next() {
            None => break,
            Some(Ok(entry)) => {
                if entry.file_type().is_file() {
                    paths.push(entry.into_path());
                }
            }
            Some(Err(err)) => warn!(error = %err, "skipped unreadable directory entry"),
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_simple_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file1.txt"), "hello").unwrap();
        fs::write(dir.path().join("file2.txt"), "world").unwrap();

        let entries = Scanner::new(dir.path()).scan().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.path.is_absolute()));
        assert!(entries.iter().any(|e| e.path.ends_with("file1.txt")));
        assert!(entries.iter().any(|e| e.path.ends_with("file2.txt")));
    }

    #[tokio::test]
    async fn test_scan_nested_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub/dir")).unwrap();
        fs::write(dir.path().join("root.txt"), "root").unwrap();
        fs::write(dir.path().join("sub/nested.txt"), "nested").unwrap();
        fs::write(dir.path().join("sub/dir/deep.txt"), "deep").unwrap();

        let entries = Scanner::new(dir.path()).scan().await.unwrap();

        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_entries_are_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();

        let entries = Scanner::new(dir.path()).scan().await.unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        let mut sorted = paths.clone();
        sorted.sort();

        assert_eq!(paths, sorted);
    }

    #[tokio::test]
    async fn test_chunk_size_does_not_change_results() {
        let dir = TempDir::new().unwrap();
        for i in 0..25 {
            fs::write(
                dir.path().join(format!("f{i:02}.txt")),
                format!("content {i}"),
            )
            .unwrap();
        }

        let small = Scanner::new(dir.path()).chunk_size(3).scan().await.unwrap();
        let large = Scanner::new(dir.path()).chunk_size(200).scan().await.unwrap();

        assert_eq!(small, large);
        assert_eq!(small.len(), 25);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ok.txt"), "fine").unwrap();
        let locked = dir.path().join("locked.txt");
        fs::write(&locked, "secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        if fs::File::open(&locked).is_ok() {
            // Privileged user; permission bits don't apply.
            return;
        }

        let entries = Scanner::new(dir.path()).scan().await.unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.ends_with("ok.txt"));
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");

        let err = Scanner::new(&gone).scan().await.unwrap_err();
        assert!(matches!(err, SnapshotError::Scan { .. }));
    }
}
