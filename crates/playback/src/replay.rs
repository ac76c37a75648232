// Record replay, inline or on a worker thread
//
// A worker owns the store and a back-buffer grid for its whole run and hands
// both back through its join handle. The only state shared with the caller
// is the progress counter and the active flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use pxlog_engine::Grid;
use pxlog_io::{LogStore, ReplayRecord};

use crate::error::{PlaybackError, PlaybackResult};

/// Records replayed so far out of the records the replay will apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayProgress {
    pub done: u64,
    pub total: u64,
}

impl ReplayProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

/// Apply every record between the store cursor and `target` to `grid`.
pub(crate) fn replay_into(
    store: &mut LogStore,
    grid: &mut Grid,
    target: u64,
    mut on_applied: impl FnMut(),
) -> PlaybackResult<u64> {
    store.query_records(target, |record: ReplayRecord| -> PlaybackResult<()> {
        grid.perform_action(record.x, record.y, record.direction, record.fields.as_ref())?;
        on_applied();
        Ok(())
    })
}

pub(crate) struct WorkerOutput {
    pub store: LogStore,
    pub grid: Grid,
    pub result: PlaybackResult<u64>,
}

/// An in-flight background replay.
pub(crate) struct ReplayJob {
    handle: JoinHandle<WorkerOutput>,
    progress: Arc<Mutex<ReplayProgress>>,
    active: Arc<AtomicBool>,
    target: u64,
}

impl ReplayJob {
    pub fn spawn(mut store: LogStore, mut grid: Grid, target: u64) -> Self {
        let total = store.cursor().abs_diff(target);
        let progress = Arc::new(Mutex::new(ReplayProgress { done: 0, total }));
        let active = Arc::new(AtomicBool::new(true));

        let worker_progress = Arc::clone(&progress);
        let worker_active = Arc::clone(&active);
        let handle = thread::spawn(move || {
            log::debug!("Replay worker started ({} -> {}, {} records)", store.cursor(), target, total);
            let result = replay_into(&mut store, &mut grid, target, || {
                worker_progress.lock().done += 1;
            });
            worker_active.store(false, Ordering::Release);
            WorkerOutput { store, grid, result }
        });

        Self { handle, progress, active, target }
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn progress(&self) -> ReplayProgress {
        *self.progress.lock()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether `join` would return without blocking. Also true after a panic,
    /// when the active flag is never cleared.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> PlaybackResult<WorkerOutput> {
        self.handle.join().map_err(|_| PlaybackError::WorkerPanicked)
    }
}
