//! Snapshot orchestration: bootstrap, update, and single-file refresh

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::diff::{self, Classification};
use crate::error::{Result, SnapshotError};
use crate::hash::DEFAULT_SEED;
use crate::scan::{FileEntry, Scanner};
use crate::snapshot::{Snapshot, SnapshotDiff};
use crate::store;

/// Take or refresh the snapshot for a directory and report what changed
///
/// The snapshot file is `<snapshot_id or directory basename>.snapshot`
/// under `snapshot_root` (created if missing). With no prior snapshot this
/// bootstraps: the whole tree is scanned and persisted and the returned
/// diff is empty, there being nothing to compare against. With a prior
/// snapshot the tree it records is rescanned, classified against it, and
/// the refreshed snapshot replaces the old one atomically.
///
/// # Errors
/// Fails if the directory cannot be resolved or scanned, or if the
/// snapshot file cannot be loaded, decoded, or persisted.
pub async fn snapshot_directory(
    directory: impl AsRef<Path>,
    snapshot_root: impl AsRef<Path>,
    snapshot_id: Option<&str>,
) -> Result<SnapshotDiff> {
    let directory = normalize(directory.as_ref())?;
    let snapshot_root = snapshot_root.as_ref();
    tokio::fs::create_dir_all(snapshot_root)
        .await
        .map_err(|source| SnapshotError::Persist {
            path: snapshot_root.to_path_buf(),
            source,
        })?;

    let name = snapshot_id.map_or_else(|| basename(&directory), str::to_owned);
    let snapshot_file = snapshot_root.join(format!("{name}.{}", store::SNAPSHOT_EXTENSION));

    if !store::exists(&snapshot_file) {
        debug!(directory = %directory.display(), "bootstrapping snapshot");
        let entries = Scanner::new(&directory).scan().await?;
        let snapshot = Snapshot::from_entries(directory, entries);
        store::save(&snapshot_file, &snapshot).await?;
        return Ok(SnapshotDiff::default());
    }

    let old = store::load(&snapshot_file).await?;
    let entries = Scanner::new(&old.root).scan().await?;
    let result = diff::diff(&old, &entries);
    let refreshed = Snapshot::from_entries(old.root, entries);
    store::save(&snapshot_file, &refreshed).await?;

    Ok(result)
}

/// Re-evaluate a single file against an existing snapshot
///
/// Classifies the file with the same rules as a full rescan, splices its
/// entry into the snapshot, and persists the result atomically. No tree
/// walk and no internal concurrency: one file, one hash. A file that
/// cannot be read is the per-file policy: logged, skipped, snapshot left
/// untouched, empty diff returned.
///
/// # Errors
/// Fails if the snapshot cannot be loaded, decoded, or persisted.
pub async fn update_single_file(
    file_path: impl AsRef<Path>,
    snapshot_path: impl AsRef<Path>,
) -> Result<SnapshotDiff> {
    let file_path = normalize(file_path.as_ref())?;
    let snapshot_path = snapshot_path.as_ref();

    let old = store::load(snapshot_path).await?;

    let read = {
        let path = file_path.clone();
        tokio::task::spawn_blocking(move || FileEntry::read(&path, DEFAULT_SEED)).await
    };
    let entry = match read {
        Ok(Ok(entry)) => entry,
        Ok(Err(err)) => {
            warn!(path = %file_path.display(), error = %err, "skipped unreadable file");
            return Ok(SnapshotDiff::default());
        }
        Err(err) => {
            warn!(error = %err, "hash task aborted");
            return Ok(SnapshotDiff::default());
        }
    };

    let mut result = SnapshotDiff::default();
    {
        let lookup = diff::hash_lookup(&old.entries);
        match diff::classify(&entry, &old, &lookup) {
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

    let mut entries: Vec<FileEntry> = old
        .entries
        .into_iter()
        .filter(|existing| existing.path != entry.path)
        .collect();
    entries.push(entry);

    let refreshed = Snapshot::from_entries(old.root, entries);
    store::save(snapshot_path, &refreshed).await?;

    Ok(result)
}

/// Absolute path without resolving symlinks
fn normalize(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|source| SnapshotError::Scan {
        path: path.to_path_buf(),
        source,
    })
}

/// Final component of the directory, used as the default snapshot name
fn basename(directory: &Path) -> String {
    directory.file_name().map_or_else(
        || "root".to_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}
