//! Snapshot data model: a persisted view of one directory tree

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::SystemTime;

use serde::Serialize;

use crate::scan::FileEntry;

/// Persisted state of one directory tree as of its last successful scan
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// The directory this snapshot describes
    pub root: PathBuf,
    /// One entry per file seen by the last scan
    pub entries: Vec<FileEntry>,
    /// Last-write time recorded per path when each file was last scanned
    pub last_seen: HashMap<PathBuf, SystemTime>,
}

impl Snapshot {
    /// Build a snapshot from scanned entries
    ///
    /// The `last_seen` map is derived from the entries, so the recorded
    /// mtime matches the entry's `modified` for every live path.
    #[must_use]
    pub fn from_entries(root: impl Into<PathBuf>, entries: Vec<FileEntry>) -> Self {
        let last_seen = entries
            .iter()
            .map(|entry| (entry.path.clone(), entry.modified))
            .collect();

        Self {
            root: root.into(),
            entries,
            last_seen,
        }
    }

    /// Get the number of tracked files
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no files are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Classified changes between a snapshot and a fresh scan
///
/// The new-path side of a detected rename also appears in `updated`;
/// `renamed` is supplementary detail, not a fifth disjoint bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    /// Paths newly present with no plausible prior identity
    pub added: BTreeSet<PathBuf>,
    /// Paths present in the old snapshot but absent from the live scan
    pub removed: BTreeSet<PathBuf>,
    /// Paths whose content or identity changed since the last scan
    pub updated: BTreeSet<PathBuf>,
    /// (old path, new path) pairs correlated via content signature
    pub renamed: BTreeSet<(PathBuf, PathBuf)>,
}

impl SnapshotDiff {
    /// Check if there are any changes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.renamed.is_empty()
    }

    /// Get the total number of classification entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len() + self.renamed.len()
    }
}
