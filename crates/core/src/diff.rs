//! Change classification against a prior snapshot
//!
//! Classification is a pure function of (old snapshot, live entries): the
//! hash lookup is built once from the old snapshot and never mutated, and a
//! single aggregator folds per-entry outcomes into the result sets.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::info;

use crate::hash::ContentHash;
use crate::scan::FileEntry;
use crate::snapshot::{Snapshot, SnapshotDiff};

/// Maximum clock slack (strictly less) between a rename source's recorded
/// mtime and the live mtime when the live path has its own scan history
pub const RENAME_MTIME_TOLERANCE: Duration = Duration::from_secs(1);

/// Lookup from content hash to the old entries sharing it, in snapshot order
pub(crate) type HashLookup<'a> = HashMap<ContentHash, Vec<&'a FileEntry>>;

/// Build the correlation lookup from the old snapshot's entry list
///
/// Entry order within each bucket is old-snapshot order; rename correlation
/// takes the first match, so that order is load-bearing.
pub(crate) fn hash_lookup(entries: &[FileEntry]) -> HashLookup<'_> {
    let mut lookup: HashLookup<'_> = HashMap::new();
    for entry in entries {
        lookup.entry(entry.hash).or_default().push(entry);
    }
    lookup
}

/// Outcome of classifying one live file against the old snapshot
#[derive(Debug)]
pub(crate) enum Classification<'a> {
    Unchanged,
    Added,
    Updated,
    Renamed { from: &'a Path },
}

/// Classify one live entry
///
/// Case A: the path was seen before, so its own recorded mtime decides
/// whether anything changed. A changed file is still checked as a rename
/// target, with sub-second slack for clock and filesystem timestamp
/// rounding. Case B: a new path has no history to anchor to, so only an
/// exact size+mtime agreement is accepted as a rename.
pub(crate) fn classify<'a>(
    live: &FileEntry,
    old: &'a Snapshot,
    lookup: &HashLookup<'a>,
) -> Classification<'a> {
    match old.last_seen.get(&live.path) {
        Some(&seen) => {
            if live.modified <= seen {
                return Classification::Unchanged;
            }

            if let Some(candidates) = lookup.get(&live.hash) {
                let matched = candidates.iter().copied().find(|old_entry| {
                    old_entry.size == live.size
                        && within_tolerance(old_entry.modified, live.modified)
                });
                if let Some(old_entry) = matched {
                    if old_entry.path != live.path {
                        return Classification::Renamed {
                            from: &old_entry.path,
                        };
                    }
                }
            }

            Classification::Updated
        }
        None => {
            if let Some(candidates) = lookup.get(&live.hash) {
                let matched = candidates.iter().copied().find(|old_entry| {
                    old_entry.size == live.size && old_entry.modified == live.modified
                });
                if let Some(old_entry) = matched {
                    return Classification::Renamed {
                        from: &old_entry.path,
                    };
                }
            }

            Classification::Added
        }
    }
}

fn within_tolerance(a: SystemTime, b: SystemTime) -> bool {
    let delta = match a.duration_since(b) {
        Ok(forward) => forward,
        Err(backward) => backward.duration(),
    };
    delta < RENAME_MTIME_TOLERANCE
}

/// Classify every live entry against the old snapshot
///
/// `removed` is every old path absent from the live set that was not
/// correlated as the source of a rename.
#[must_use]
pub fn diff(old: &Snapshot, live: &[FileEntry]) -> SnapshotDiff {
    let lookup = hash_lookup(&old.entries);
    let mut result = SnapshotDiff::default();

    for entry in live {
        match classify(entry, old, &lookup) {
            Classification::Unchanged => {}
            Classification::Added => {
                result.added.insert(entry.path.clone());
            }
            Classification::Updated => {
                result.updated.insert(entry.path.clone());
            }
            Classification::Renamed { from } => {
                info!(from = %from.display(), to = %entry.path.display(), "detected rename");
                result
                    .renamed
                    .insert((from.to_path_buf(), entry.path.clone()));
                result.updated.insert(entry.path.clone());
            }
        }
    }

    let live_paths: HashSet<&Path> = live.iter().map(|entry| entry.path.as_path()).collect();
    let rename_sources: HashSet<&Path> = result
        .renamed
        .iter()
        .map(|(from, _)| from.as_path())
        .collect();
    for old_entry in &old.entries {
        let path = old_entry.path.as_path();
        if !live_paths.contains(path) && !rename_sources.contains(path) {
            result.removed.insert(old_entry.path.clone());
        }
    }

    result
}
