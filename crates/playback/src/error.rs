use pxlog_engine::GridError;
use pxlog_io::StoreError;
use thiserror::Error;

pub type PlaybackResult<T> = Result<T, PlaybackError>;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Grid rejected a record or snapshot. During replay this means the
    /// store's index is inconsistent.
    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    /// A background replay is in flight; retry after it completes.
    #[error("a replay is in progress")]
    Busy,

    /// The store was lost with a panicked replay worker.
    #[error("no store is open")]
    NoStore,

    #[error("replay worker panicked")]
    WorkerPanicked,

    #[error("step size must be non-zero")]
    InvalidStep,

    #[error("snapshot interval must be non-zero")]
    InvalidInterval,
}
