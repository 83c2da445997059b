use std::path::PathBuf;

use thiserror::Error;

/// The only error kind that escapes this crate's API (§7.3 resource failure).
///
/// Malformed escape sequences and codec decode failures are absorbed
/// silently by the parser; this type exists solely for history-backend I/O
/// problems, which a Screen surfaces once and then degrades past.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to grow history file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to map history file {path:?}: {source}")]
    Mmap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
