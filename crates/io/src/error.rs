use std::path::PathBuf;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Input file or store does not exist.
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    /// Path points at a directory.
    #[error("{} is a directory", .0.display())]
    IsDirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A raw log line could not be parsed. Ingestion is aborted.
    #[error("line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    /// The file is a database but not a store this build can read.
    #[error("incompatible store: {0}")]
    Incompatible(String),

    /// Seek or snapshot target beyond the record count.
    #[error("target {target} is out of range (0..={total})")]
    OutOfRange { target: u64, total: u64 },

    /// Stored data violates an index invariant.
    #[error("store corrupted: {0}")]
    Corrupt(String),
}
