// Playback over an indexed action log
//
// The controller owns the store and the materialized grid, resolves seeks
// against persisted snapshots, and moves long replays onto a worker thread.

pub mod controller;
pub mod describe;
pub mod error;
pub mod mode;
pub mod plan;
mod replay;

pub use controller::{Playback, PlaybackOptions, SeekOutcome, Status, TickOutcome};
pub use describe::CellDescription;
pub use error::{PlaybackError, PlaybackResult};
pub use mode::{PlaybackMode, DEFAULT_STEP, MAX_STEP};
pub use plan::{plan_seek, Anchor, SeekPlan};
pub use replay::ReplayProgress;
