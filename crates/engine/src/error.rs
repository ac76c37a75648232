use thiserror::Error;

pub type GridResult<T> = Result<T, GridError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// Coordinate outside the canvas.
    #[error("cell ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    /// A redo was requested without the record's fields.
    #[error("forward action on ({x}, {y}) is missing its fields")]
    MissingFields { x: u32, y: u32 },

    /// An undo left the cell painted but no prior state was supplied.
    /// The per-cell chain in the store is inconsistent with the grid.
    #[error("broken history chain at ({x}, {y}): count {count} remains but no previous action was supplied")]
    BrokenChain { x: u32, y: u32, count: u32 },

    /// Snapshot blob length does not match the canvas.
    #[error("snapshot is {actual} bytes, expected {expected}")]
    SnapshotSize { expected: usize, actual: usize },

    /// A cell inside a snapshot could not be decoded or encoded.
    #[error("snapshot cell {index}: {reason}")]
    SnapshotCell { index: usize, reason: String },
}
