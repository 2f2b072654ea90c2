//! Error taxonomy for snapshot operations
//!
//! Per-file failures during a scan are deliberately absent: those are
//! recovered locally (logged and skipped) and never reach the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, computing, or persisting snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No snapshot file where one was required
    #[error("no snapshot at {}", path.display())]
    NotFound {
        /// Expected snapshot file location
        path: PathBuf,
    },

    /// Snapshot file exists but does not decode
    #[error("corrupt snapshot at {}: {reason}", path.display())]
    Corrupt {
        /// Snapshot file location
        path: PathBuf,
        /// Decoder failure detail
        reason: String,
    },

    /// Snapshot could not be serialized
    #[error("failed to encode snapshot: {reason}")]
    Encode {
        /// Encoder failure detail
        reason: String,
    },

    /// Snapshot file could not be read
    #[error("failed to read snapshot at {}", path.display())]
    Read {
        /// Snapshot file location
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Temp-file write or atomic replace failed; any prior snapshot is intact
    #[error("failed to persist snapshot at {}", path.display())]
    Persist {
        /// File the write or rename targeted
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The scan root could not be resolved or enumerated
    #[error("cannot scan {}", path.display())]
    Scan {
        /// Offending path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Config file exists but does not parse
    #[error("invalid config at {}: {reason}", path.display())]
    Config {
        /// Config file location
        path: PathBuf,
        /// Parser failure detail
        reason: String,
    },
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, SnapshotError>;
