//! Binary snapshot codec using rkyv
//!
//! The on-disk form is a separate set of archived record types; paths are
//! archived as strings and timestamps as (seconds, nanoseconds) relative to
//! the UNIX epoch, so sub-second precision round-trips exactly. Output is
//! deterministic: entries and the last-seen map are ordered by path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rkyv::rancor::Error as RkyvError;
use rkyv::{Archive, Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::scan::FileEntry;
use crate::snapshot::Snapshot;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Archived snapshot
#[derive(Archive, Serialize, Deserialize, Debug)]
#[rkyv(derive(Debug))]
struct SnapshotRecord {
    root: String,
    entries: Vec<EntryRecord>,
    last_seen: Vec<SeenRecord>,
}

/// One `last_seen` mapping entry: path and the mtime recorded at its last scan
#[derive(Archive, Serialize, Deserialize, Debug, Clone)]
#[rkyv(derive(Debug))]
struct SeenRecord {
    path: String,
    mtime: TimeRecord,
}

#[derive(Archive, Serialize, Deserialize, Debug, Clone)]
#[rkyv(derive(Debug))]
struct EntryRecord {
    path: String,
    size: u64,
    mtime: TimeRecord,
    hash: u64,
}

/// Seconds and nanoseconds relative to the UNIX epoch
///
/// Negative seconds are pre-epoch; `nanos` always counts forward from the
/// second boundary.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy)]
#[rkyv(derive(Debug))]
struct TimeRecord {
    secs: i64,
    nanos: u32,
}

impl TimeRecord {
    fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self {
                secs: since.as_secs() as i64,
                nanos: since.subsec_nanos(),
            },
            Err(err) => {
                let before = err.duration();
                if before.subsec_nanos() == 0 {
                    Self {
                        secs: -(before.as_secs() as i64),
                        nanos: 0,
                    }
                } else {
                    Self {
                        secs: -(before.as_secs() as i64) - 1,
                        nanos: NANOS_PER_SEC - before.subsec_nanos(),
                    }
                }
            }
        }
    }

    fn to_system_time(self) -> SystemTime {
        if self.secs >= 0 {
            UNIX_EPOCH + Duration::new(self.secs as u64, self.nanos)
        } else {
            UNIX_EPOCH - Duration::from_secs(self.secs.unsigned_abs()) + Duration::new(0, self.nanos)
        }
    }
}

impl From<&FileEntry> for EntryRecord {
    fn from(entry: &FileEntry) -> Self {
        Self {
            path: entry.path.to_string_lossy().into_owned(),
            size: entry.size,
            mtime: TimeRecord::from_system_time(entry.modified),
            hash: entry.hash.as_u64(),
        }
    }
}

impl From<&EntryRecord> for FileEntry {
    fn from(record: &EntryRecord) -> Self {
        Self {
            path: PathBuf::from(&record.path),
            size: record.size,
            modified: record.mtime.to_system_time(),
            hash: ContentHash::from_raw(record.hash),
        }
    }
}

/// Encode a snapshot to its on-disk byte form
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, RkyvError> {
    let mut entries: Vec<EntryRecord> = snapshot.entries.iter().map(EntryRecord::from).collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    let mut last_seen: Vec<SeenRecord> = snapshot
        .last_seen
        .iter()
        .map(|(path, &time)| SeenRecord {
            path: path.to_string_lossy().into_owned(),
            mtime: TimeRecord::from_system_time(time),
        })
        .collect();
    last_seen.sort_by(|a, b| a.path.cmp(&b.path));

    let record = SnapshotRecord {
        root: snapshot.root.to_string_lossy().into_owned(),
        entries,
        last_seen,
    };

    let bytes = rkyv::to_bytes::<RkyvError>(&record)?;
    Ok(bytes.to_vec())
}

/// Decode a snapshot from bytes produced by [`encode`]
///
/// # Errors
/// Returns an error if the buffer is not a valid snapshot record.
pub fn decode(bytes: &[u8]) -> Result<Snapshot, RkyvError> {
    let archived = rkyv::access::<ArchivedSnapshotRecord, RkyvError>(bytes)?;
    let record: SnapshotRecord = rkyv::deserialize::<SnapshotRecord, RkyvError>(archived)?;

    let entries: Vec<FileEntry> = record.entries.iter().map(FileEntry::from).collect();
    let last_seen: HashMap<PathBuf, SystemTime> = record
        .last_seen
        .iter()
        .map(|seen| (PathBuf::from(&seen.path), seen.mtime.to_system_time()))
        .collect();

    Ok(Snapshot {
        root: PathBuf::from(&record.root),
        entries,
        last_seen,
    })
}
