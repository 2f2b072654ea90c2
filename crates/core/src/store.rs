//! On-disk snapshot persistence with atomic replace

use std::io;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::{Result, SnapshotError};
use crate::snapshot::Snapshot;

/// File extension for persisted snapshots
pub const SNAPSHOT_EXTENSION: &str = "snapshot";

/// Check whether a snapshot file is present
#[must_use]
pub fn exists(path: &Path) -> bool {
    path.is_file()
}

/// Load and decode a snapshot file
///
/// # Errors
/// [`SnapshotError::NotFound`] if the file is absent, [`SnapshotError::Read`]
/// if it cannot be read, [`SnapshotError::Corrupt`] if it does not decode. A
/// corrupt file never silently yields an empty snapshot.
pub async fn load(path: &Path) -> Result<Snapshot> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            return Err(SnapshotError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(SnapshotError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    codec::decode(&bytes).map_err(|err| SnapshotError::Corrupt {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Encode and persist a snapshot, replacing any prior file atomically
///
/// The bytes land in a sibling `<name>.tmp` first; the target is then
/// replaced in a single same-filesystem rename (or the temp file is moved
/// into place when no target exists yet). An interrupted save leaves the
/// prior snapshot intact.
///
/// # Errors
/// [`SnapshotError::Encode`] if serialization fails, [`SnapshotError::Persist`]
/// if the temp write or the rename fails.
pub async fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let bytes = codec::encode(snapshot).map_err(|err| SnapshotError::Encode {
        reason: err.to_string(),
    })?;

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|source| SnapshotError::Persist {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| SnapshotError::Persist {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(())
}

/// Sibling temp file: `<name>.snapshot.tmp`
fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};

    use tempfile::TempDir;

    use crate::hash::{ContentHash, DEFAULT_SEED};
    use crate::scan::FileEntry;

    fn sample_snapshot() -> Snapshot {
        Snapshot::from_entries(
            "/tree",
            vec![FileEntry {
                path: PathBuf::from("/tree/a.txt"),
                size: 5,
                modified: UNIX_EPOCH + Duration::new(1_700_000_000, 42),
                hash: ContentHash::from_bytes(b"alpha", DEFAULT_SEED),
            }],
        )
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.snapshot");
        let snapshot = sample_snapshot();

        assert!(!exists(&path));
        save(&path, &snapshot).await.unwrap();
        assert!(exists(&path));

        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.snapshot");

        let err = load(&path).await.unwrap_err();
        assert!(matches!(err, SnapshotError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.snapshot");
        fs::write(&path, b"this is not an archived snapshot").unwrap();

        let err = load(&path).await.unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.snapshot");

        save(&path, &sample_snapshot()).await.unwrap();

        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_interrupted_persist_leaves_target_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.snapshot");
        let snapshot = sample_snapshot();
        save(&path, &snapshot).await.unwrap();

        // A crash between the temp write and the rename leaves a stray temp
        // file behind; the target must still load as the prior version.
        fs::write(tmp_path(&path), b"half-written junk").unwrap();

        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded, snapshot);

        // The next save replaces both the stray temp file and the target.
        save(&path, &snapshot).await.unwrap();
        assert!(!tmp_path(&path).exists());
        assert_eq!(load(&path).await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_save_replaces_prior_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.snapshot");
        save(&path, &sample_snapshot()).await.unwrap();

        let updated = Snapshot::from_entries("/tree", Vec::new());
        save(&path, &updated).await.unwrap();

        let loaded = load(&path).await.unwrap();
        assert!(loaded.is_empty());
    }
}
