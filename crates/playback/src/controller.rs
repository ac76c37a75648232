use std::fmt;
use std::path::Path;

use pxlog_engine::{Grid, Palette};
use pxlog_io::{LogStore, StoreError};

use crate::describe::CellDescription;
use crate::error::{PlaybackError, PlaybackResult};
use crate::mode::{at_travel_bound, next_target, normalize_step, PlaybackMode, DEFAULT_STEP};
use crate::plan::{plan_seek, Anchor, SeekPlan};
use crate::replay::{replay_into, ReplayJob, ReplayProgress, WorkerOutput};

/// Replays longer than this run on a worker thread.
pub const DEFAULT_OFFLOAD_THRESHOLD: u64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    pub offload_threshold: u64,
    pub step: i64,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self { offload_threshold: DEFAULT_OFFLOAD_THRESHOLD, step: DEFAULT_STEP }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The grid reflects the target. `replayed` records were applied.
    Completed { replayed: u64 },
    /// The replay runs in the background; call `poll` until it completes.
    Offloaded { records: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Paused,
    /// A replay is in flight.
    Busy(ReplayProgress),
    Moved { cursor: u64 },
}

/// Status readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub cursor: u64,
    pub total: u64,
    pub mode: PlaybackMode,
    pub step: i64,
    pub replay: Option<ReplayProgress>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} [{}, step {}]", self.cursor, self.total, self.mode.label(), self.step)?;
        if let Some(progress) = self.replay {
            write!(f, " replaying {}/{}", progress.done, progress.total)?;
        }
        Ok(())
    }
}

/// Playback controller.
///
/// Holds the front grid, which always reflects `cursor`. A long seek hands
/// the store and a back buffer to a worker; the front grid stays readable
/// at the old cursor until `poll` swaps the buffers.
pub struct Playback {
    /// `None` only while a worker owns the store (or after it panicked)
    store: Option<LogStore>,
    grid: Grid,
    snapshot_ids: Vec<u64>,
    width: u32,
    height: u32,
    total: u64,
    cursor: u64,
    mode: PlaybackMode,
    step: i64,
    offload_threshold: u64,
    replay: Option<ReplayJob>,
    /// The in-flight replay was started by a PLAY tick
    replay_from_tick: bool,
}

impl fmt::Debug for Playback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Playback").field("status", &self.status()).finish()
    }
}

impl Playback {
    pub fn new(store: LogStore, options: PlaybackOptions) -> PlaybackResult<Self> {
        let mut playback = Self {
            store: None,
            grid: Grid::new(0, 0),
            snapshot_ids: Vec::new(),
            width: 0,
            height: 0,
            total: 0,
            cursor: 0,
            mode: PlaybackMode::Pause,
            step: normalize_step(options.step)?,
            offload_threshold: options.offload_threshold,
            replay: None,
            replay_from_tick: false,
        };
        playback.install(store)?;
        Ok(playback)
    }

    /// Open a converted store. Replaces the current one only on success.
    pub fn open_store(&mut self, path: &Path) -> PlaybackResult<()> {
        self.ensure_idle()?;
        let store = LogStore::open(path)?;
        self.install(store)
    }

    /// Convert a raw log and open the result. Replaces the current store
    /// only on success.
    pub fn open_raw(&mut self, raw: &Path) -> PlaybackResult<()> {
        self.ensure_idle()?;
        let store = LogStore::convert(raw)?;
        self.install(store)
    }

    fn install(&mut self, mut store: LogStore) -> PlaybackResult<()> {
        let snapshot_ids = store.snapshot_ids()?;
        store.seek(0)?;

        let mut grid = Grid::new(store.width(), store.height());
        grid.set_palette(self.grid.palette().clone());

        self.width = store.width();
        self.height = store.height();
        self.total = store.record_count();
        self.cursor = 0;
        self.snapshot_ids = snapshot_ids;
        self.mode = PlaybackMode::Pause;
        self.grid = grid;
        self.store = Some(store);
        Ok(())
    }

    // =========================================================================
    // Readout
    // =========================================================================

    /// Front grid. Never reflects a replay in progress.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn snapshot_ids(&self) -> &[u64] {
        &self.snapshot_ids
    }

    pub fn is_replay_active(&self) -> bool {
        self.replay.is_some()
    }

    pub fn replay_progress(&self) -> Option<ReplayProgress> {
        self.replay.as_ref().map(ReplayJob::progress)
    }

    pub fn status(&self) -> Status {
        Status {
            cursor: self.cursor,
            total: self.total,
            mode: self.mode,
            step: self.step,
            replay: self.replay.as_ref().filter(|job| job.is_active()).map(ReplayJob::progress),
        }
    }

    pub fn describe_cell(&self, x: u32, y: u32) -> Option<CellDescription> {
        CellDescription::of(&self.grid, x, y)
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.grid.set_palette(palette);
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub fn toggle_play(&mut self) -> PlaybackMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    /// Set the signed step, clamped to the allowed range. Returns the step in effect.
    pub fn set_step(&mut self, step: i64) -> PlaybackResult<i64> {
        self.step = normalize_step(step)?;
        Ok(self.step)
    }

    fn ensure_idle(&self) -> PlaybackResult<()> {
        if self.replay.is_some() {
            return Err(PlaybackError::Busy);
        }
        Ok(())
    }

    fn store_mut(&mut self) -> PlaybackResult<&mut LogStore> {
        self.store.as_mut().ok_or(PlaybackError::NoStore)
    }

    /// Seek the grid to `target` (0..=total).
    ///
    /// Fails with `Busy` while a background replay is in flight. Out-of-range
    /// targets are rejected without touching the grid or cursor.
    pub fn seek(&mut self, target: u64) -> PlaybackResult<SeekOutcome> {
        self.seek_with(target, true)
    }

    fn seek_with(&mut self, target: u64, allow_offload: bool) -> PlaybackResult<SeekOutcome> {
        self.ensure_idle()?;
        if target > self.total {
            return Err(StoreError::OutOfRange { target, total: self.total }.into());
        }
        if target == self.cursor {
            return Ok(SeekOutcome::Completed { replayed: 0 });
        }

        let plan = plan_seek(self.cursor, target, &self.snapshot_ids);
        let distance = plan.replay_distance();
        log::debug!("Seek {} -> {}: {:?}", self.cursor, target, plan);

        if allow_offload && distance > self.offload_threshold {
            self.start_background(plan)?;
            return Ok(SeekOutcome::Offloaded { records: distance });
        }

        self.apply_anchor(plan.anchor)?;
        let replayed = {
            let Self { store, grid, .. } = self;
            let store = store.as_mut().ok_or(PlaybackError::NoStore)?;
            replay_into(store, grid, target, || {})
        };
        match replayed {
            Ok(replayed) => {
                self.cursor = target;
                Ok(SeekOutcome::Completed { replayed })
            }
            Err(e) => {
                self.reset_after_failure();
                Err(e)
            }
        }
    }

    /// Jump the front grid to the plan's anchor.
    fn apply_anchor(&mut self, anchor: Option<Anchor>) -> PlaybackResult<()> {
        match anchor {
            None => {}
            Some(Anchor::Clear) => {
                self.store_mut()?.seek(0)?;
                self.grid.clear_canvas();
                self.cursor = 0;
            }
            Some(Anchor::Snapshot(id)) => {
                let blob = self.load_blob(id)?;
                self.grid.load_snapshot(&blob)?;
                self.store_mut()?.seek(id)?;
                self.cursor = id;
            }
        }
        Ok(())
    }

    fn load_blob(&mut self, id: u64) -> PlaybackResult<Vec<u8>> {
        let blob = self.store_mut()?.snapshot(id)?;
        blob.ok_or_else(|| StoreError::Corrupt(format!("snapshot {id} is listed but missing")).into())
    }

    fn start_background(&mut self, plan: SeekPlan) -> PlaybackResult<()> {
        // Back buffer starts at the anchor, or as a copy of the front grid
        let mut back = match plan.anchor {
            None => self.grid.clone(),
            Some(Anchor::Clear) => Grid::new(self.width, self.height),
            Some(Anchor::Snapshot(id)) => {
                let blob = self.load_blob(id)?;
                let mut grid = Grid::new(self.width, self.height);
                grid.load_snapshot(&blob)?;
                grid
            }
        };
        back.set_palette(self.grid.palette().clone());

        let mut store = self.store.take().ok_or(PlaybackError::NoStore)?;
        if let Err(e) = store.seek(plan.from) {
            self.store = Some(store);
            return Err(e.into());
        }

        log::info!("Replaying {} records in the background ({} -> {})", plan.replay_distance(), plan.from, plan.target);
        self.replay = Some(ReplayJob::spawn(store, back, plan.target));
        Ok(())
    }

    /// Reap a finished background replay and swap in its grid.
    ///
    /// Returns the final progress when a replay completed during this call,
    /// `None` when nothing finished. Never blocks on a running worker.
    pub fn poll(&mut self) -> PlaybackResult<Option<ReplayProgress>> {
        match &self.replay {
            Some(job) if job.is_finished() => {}
            _ => return Ok(None),
        }
        let Some(job) = self.replay.take() else {
            return Ok(None);
        };
        let target = job.target();
        let progress = job.progress();
        let from_tick = std::mem::take(&mut self.replay_from_tick);

        let WorkerOutput { store, mut grid, result } = match job.join() {
            Ok(output) => output,
            Err(e) => {
                log::error!("Replay worker panicked; store closed");
                self.grid.clear_canvas();
                self.cursor = 0;
                return Err(e);
            }
        };
        self.store = Some(store);

        match result {
            Ok(replayed) => {
                grid.set_palette(self.grid.palette().clone());
                self.grid = grid;
                self.cursor = target;
                if from_tick {
                    self.settle_mode();
                }
                log::info!("Background replay finished at {} ({} records)", target, replayed);
                Ok(Some(progress))
            }
            Err(e) => {
                self.reset_after_failure();
                Err(e)
            }
        }
    }

    /// After a failed replay the grid is no longer trustworthy: start over.
    fn reset_after_failure(&mut self) {
        log::error!("Replay failed; resetting to the start of the log");
        self.grid.clear_canvas();
        self.cursor = 0;
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.seek(0) {
                log::warn!("Could not reset store cursor: {}", e);
            }
        }
    }

    /// In PLAY, stop once the cursor reaches the bound it is travelling to.
    /// Only tick-driven seeks pause; a manual jump to the end wraps on the
    /// next tick.
    fn settle_mode(&mut self) {
        if self.mode == PlaybackMode::Play && at_travel_bound(self.cursor, self.total, self.step) {
            log::debug!("Reached {} while playing; pausing", self.cursor);
            self.mode = PlaybackMode::Pause;
        }
    }

    /// One cycle of the interactive loop.
    ///
    /// Reaps a finished replay first; while one is still in flight nothing
    /// else happens. In PLAY the cursor then advances by one step, wrapping
    /// at the bounds.
    pub fn tick(&mut self) -> PlaybackResult<TickOutcome> {
        self.poll()?;
        if let Some(progress) = self.replay_progress() {
            return Ok(TickOutcome::Busy(progress));
        }
        if self.mode == PlaybackMode::Pause {
            return Ok(TickOutcome::Paused);
        }

        let target = next_target(self.cursor, self.total, self.step);
        match self.seek(target)? {
            SeekOutcome::Offloaded { records } => {
                self.replay_from_tick = true;
                Ok(TickOutcome::Busy(ReplayProgress { done: 0, total: records }))
            }
            SeekOutcome::Completed { .. } => {
                self.settle_mode();
                Ok(TickOutcome::Moved { cursor: self.cursor })
            }
        }
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Persist the front grid at the current cursor. Returns the snapshot id.
    pub fn create_snapshot(&mut self) -> PlaybackResult<u64> {
        self.ensure_idle()?;
        let id = self.cursor;
        let blob = self.grid.encode_snapshot()?;
        self.store_mut()?.put_snapshot(id, &blob)?;
        if let Err(pos) = self.snapshot_ids.binary_search(&id) {
            self.snapshot_ids.insert(pos, id);
        }
        log::info!("Created snapshot at {}", id);
        Ok(id)
    }

    /// Persist a snapshot at every multiple of `interval` up to the total,
    /// then return to the cursor held before. Returns the ids written.
    ///
    /// Runs synchronously regardless of the offload threshold.
    pub fn build_snapshots(&mut self, interval: u64) -> PlaybackResult<Vec<u64>> {
        self.ensure_idle()?;
        if interval == 0 {
            return Err(PlaybackError::InvalidInterval);
        }
        let (saved_cursor, saved_mode) = (self.cursor, self.mode);
        self.mode = PlaybackMode::Pause;

        let mut created = Vec::new();
        let mut id = interval;
        while id <= self.total {
            self.seek_with(id, false)?;
            created.push(self.create_snapshot()?);
            id = match id.checked_add(interval) {
                Some(next) => next,
                None => break,
            };
        }

        self.seek_with(saved_cursor, false)?;
        self.mode = saved_mode;
        log::info!("Built {} snapshots every {} records", created.len(), interval);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pxlog_engine::CellState;
    use std::fs;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn line(second: u32, x: u32, y: u32, color: u32) -> String {
        format!("2021-04-10 12:{:02}:{:02},500\tuser{}\t{}\t{}\t{}\tuser place\n", second / 60, second % 60, second, x, y, color)
    }

    fn store_from(dir: &TempDir, lines: &[String]) -> PathBuf {
        let raw = dir.path().join("canvas.log");
        fs::write(&raw, lines.concat()).unwrap();
        LogStore::convert(&raw).unwrap().path().to_path_buf()
    }

    fn playback(dir: &TempDir, lines: &[String], options: PlaybackOptions) -> Playback {
        let path = store_from(dir, lines);
        Playback::new(LogStore::open(&path).unwrap(), options).unwrap()
    }

    /// Lines cycling over a 4x3 canvas so cells get repainted.
    fn busy_log(records: u32) -> Vec<String> {
        (0..records).map(|i| line(i, (i * 7) % 4, (i * 5) % 3, i % 16)).collect()
    }

    fn wait_for(playback: &mut Playback) -> ReplayProgress {
        loop {
            if let Some(progress) = playback.poll().unwrap() {
                return progress;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_scenario_two_actions_on_one_cell() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &[line(0, 0, 0, 2), line(1, 0, 0, 5)], PlaybackOptions::default());

        assert_eq!(playback.seek(2).unwrap(), SeekOutcome::Completed { replayed: 2 });
        let cell = playback.grid().cell(0, 0).unwrap();
        assert_eq!((cell.count, cell.color_index), (2, 5));

        playback.seek(1).unwrap();
        let cell = playback.grid().cell(0, 0).unwrap();
        assert_eq!((cell.count, cell.color_index), (1, 2));

        playback.seek(0).unwrap();
        assert_eq!(playback.grid(), &Grid::new(1, 1));
    }

    #[test]
    fn test_scenario_three_distinct_cells() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(
            &dir,
            &[line(0, 0, 0, 1), line(1, 1, 0, 2), line(2, 0, 1, 3)],
            PlaybackOptions::default(),
        );
        playback.seek(3).unwrap();
        assert_eq!(playback.grid().painted_cells(), 3);

        // Walking back is closer than clearing
        assert_eq!(playback.seek(2).unwrap(), SeekOutcome::Completed { replayed: 1 });
        playback.seek(1).unwrap();
        assert_eq!(playback.grid().painted_cells(), 1);
        assert_eq!(playback.grid().cell(0, 0).unwrap().count, 1);
        assert!(playback.grid().cell(1, 0).unwrap().is_virgin());
        assert!(playback.grid().cell(0, 1).unwrap().is_virgin());
    }

    #[test]
    fn test_seek_to_cursor_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(20), PlaybackOptions::default());
        playback.seek(12).unwrap();
        let before = playback.grid().clone();
        assert_eq!(playback.seek(12).unwrap(), SeekOutcome::Completed { replayed: 0 });
        assert_eq!(playback.grid(), &before);
    }

    #[test]
    fn test_out_of_range_seek_leaves_state() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(10), PlaybackOptions::default());
        playback.seek(4).unwrap();
        let before = playback.grid().clone();
        let err = playback.seek(11).unwrap_err();
        assert!(matches!(err, PlaybackError::Store(StoreError::OutOfRange { target: 11, total: 10 })));
        assert_eq!(playback.cursor(), 4);
        assert_eq!(playback.grid(), &before);
    }

    #[test]
    fn test_seek_zero_clears() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(30), PlaybackOptions::default());
        playback.seek(30).unwrap();
        assert_eq!(playback.seek(0).unwrap(), SeekOutcome::Completed { replayed: 0 });
        assert_eq!(playback.grid().painted_cells(), 0);
    }

    #[test]
    fn test_snapshot_jump_matches_direct_replay() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(100), PlaybackOptions::default());
        playback.seek(60).unwrap();
        let expected = playback.grid().clone();
        assert_eq!(playback.create_snapshot().unwrap(), 60);

        playback.seek(0).unwrap();
        // 0 -> 62: the snapshot at 60 is closer than the cursor
        assert_eq!(playback.seek(62).unwrap(), SeekOutcome::Completed { replayed: 2 });
        playback.seek(60).unwrap();
        assert_eq!(playback.grid(), &expected);
    }

    #[test]
    fn test_snapshot_at_zero_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(5), PlaybackOptions::default());
        assert!(matches!(playback.create_snapshot(), Err(PlaybackError::Store(StoreError::OutOfRange { .. }))));
    }

    #[test]
    fn test_build_snapshots_restores_cursor() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(95), PlaybackOptions::default());
        playback.seek(7).unwrap();
        let before = playback.grid().clone();

        assert_eq!(playback.build_snapshots(30).unwrap(), vec![30, 60, 90]);
        assert_eq!(playback.snapshot_ids(), &[30, 60, 90]);
        assert_eq!(playback.cursor(), 7);
        assert_eq!(playback.grid(), &before);
        assert!(matches!(playback.build_snapshots(0), Err(PlaybackError::InvalidInterval)));
    }

    #[test]
    fn test_background_replay_keeps_front_grid() {
        let dir = TempDir::new().unwrap();
        let options = PlaybackOptions { offload_threshold: 10, ..PlaybackOptions::default() };
        let mut playback = playback(&dir, &busy_log(400), options);
        playback.seek(5).unwrap();
        let front = playback.grid().clone();

        assert_eq!(playback.seek(400).unwrap(), SeekOutcome::Offloaded { records: 395 });
        assert!(playback.is_replay_active());
        assert!(matches!(playback.seek(3), Err(PlaybackError::Busy)));
        assert!(matches!(playback.create_snapshot(), Err(PlaybackError::Busy)));

        let mut last = 0;
        let progress = loop {
            assert_eq!(playback.grid(), &front);
            assert_eq!(playback.cursor(), 5);
            if let Some(progress) = playback.replay_progress() {
                assert!(progress.done >= last);
                last = progress.done;
            }
            if let Some(done) = playback.poll().unwrap() {
                break done;
            }
            thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(progress, ReplayProgress { done: 395, total: 395 });
        assert!(!playback.is_replay_active());
        assert_eq!(playback.cursor(), 400);

        let mut direct = Playback::new(LogStore::open(&dir.path().join("canvas.logdb")).unwrap(), PlaybackOptions::default()).unwrap();
        direct.seek(400).unwrap();
        assert_eq!(playback.grid(), direct.grid());
    }

    #[test]
    fn test_play_loop_wraps_and_pauses() {
        let dir = TempDir::new().unwrap();
        let options = PlaybackOptions { step: 4, ..PlaybackOptions::default() };
        let mut playback = playback(&dir, &busy_log(10), options);

        assert_eq!(playback.tick().unwrap(), TickOutcome::Paused);
        assert_eq!(playback.toggle_play(), PlaybackMode::Play);
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 4 });
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 8 });
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 10 });
        assert_eq!(playback.mode(), PlaybackMode::Pause);

        // Resuming at the end loops to the start
        playback.toggle_play();
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 0 });
        assert_eq!(playback.mode(), PlaybackMode::Play);
    }

    #[test]
    fn test_manual_seek_to_end_keeps_playing() {
        let dir = TempDir::new().unwrap();
        let options = PlaybackOptions { step: 4, ..PlaybackOptions::default() };
        let mut playback = playback(&dir, &busy_log(10), options);
        playback.set_mode(PlaybackMode::Play);

        playback.seek(10).unwrap();
        assert_eq!(playback.mode(), PlaybackMode::Play);
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 0 });
        assert_eq!(playback.mode(), PlaybackMode::Play);
    }

    #[test]
    fn test_manual_background_seek_to_end_keeps_playing() {
        let dir = TempDir::new().unwrap();
        let options = PlaybackOptions { offload_threshold: 3, step: 5 };
        let mut playback = playback(&dir, &busy_log(20), options);
        playback.set_mode(PlaybackMode::Play);

        assert_eq!(playback.seek(20).unwrap(), SeekOutcome::Offloaded { records: 20 });
        wait_for(&mut playback);
        assert_eq!(playback.cursor(), 20);
        assert_eq!(playback.mode(), PlaybackMode::Play);
    }

    #[test]
    fn test_play_backward() {
        let dir = TempDir::new().unwrap();
        let options = PlaybackOptions { step: -6, ..PlaybackOptions::default() };
        let mut playback = playback(&dir, &busy_log(10), options);
        playback.set_mode(PlaybackMode::Play);
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 10 });
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 4 });
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 0 });
        assert_eq!(playback.mode(), PlaybackMode::Pause);
    }

    #[test]
    fn test_play_pauses_after_background_replay() {
        let dir = TempDir::new().unwrap();
        let options = PlaybackOptions { offload_threshold: 3, step: 50 };
        let mut playback = playback(&dir, &busy_log(20), options);
        playback.set_mode(PlaybackMode::Play);
        assert!(matches!(playback.tick().unwrap(), TickOutcome::Busy(_)));
        wait_for(&mut playback);
        assert_eq!(playback.cursor(), 20);
        assert_eq!(playback.mode(), PlaybackMode::Pause);
    }

    #[test]
    fn test_empty_log_plays_to_pause() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &[], PlaybackOptions::default());
        assert_eq!(playback.dimensions(), (0, 0));
        playback.toggle_play();
        assert_eq!(playback.tick().unwrap(), TickOutcome::Moved { cursor: 0 });
        assert_eq!(playback.mode(), PlaybackMode::Pause);
    }

    #[test]
    fn test_set_step() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(3), PlaybackOptions::default());
        assert_eq!(playback.step(), DEFAULT_STEP);
        assert_eq!(playback.set_step(-20_000).unwrap(), -10_000);
        assert!(matches!(playback.set_step(0), Err(PlaybackError::InvalidStep)));
        assert_eq!(playback.step(), -10_000);
    }

    #[test]
    fn test_failed_open_keeps_current_store() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(8), PlaybackOptions::default());
        playback.seek(8).unwrap();
        assert!(playback.open_store(&dir.path().join("missing.logdb")).is_err());
        assert!(playback.open_raw(&dir.path().join("missing.log")).is_err());
        assert_eq!(playback.total(), 8);
        assert_eq!(playback.cursor(), 8);
    }

    #[test]
    fn test_open_raw_replaces_store() {
        let dir = TempDir::new().unwrap();
        let mut playback = playback(&dir, &busy_log(8), PlaybackOptions::default());
        playback.seek(8).unwrap();

        let other = dir.path().join("other.log");
        fs::write(&other, [line(0, 6, 2, 1)].concat()).unwrap();
        playback.open_raw(&other).unwrap();
        assert_eq!(playback.total(), 1);
        assert_eq!(playback.cursor(), 0);
        assert_eq!(playback.dimensions(), (7, 3));
    }

    #[test]
    fn test_corrupt_chain_resets_to_start() {
        let dir = TempDir::new().unwrap();
        let path = store_from(&dir, &[line(0, 0, 0, 1), line(1, 0, 0, 2), line(2, 0, 0, 3)]);
        let mut playback = Playback::new(LogStore::open(&path).unwrap(), PlaybackOptions::default()).unwrap();
        playback.seek(3).unwrap();

        // Sever record 3's link while the cell count is still 3
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute("UPDATE log SET prev_id = NULL WHERE id = 3", []).unwrap();
        drop(conn);

        let err = playback.seek(2).unwrap_err();
        assert!(matches!(err, PlaybackError::Grid(_)));
        assert_eq!(playback.cursor(), 0);
        assert_eq!(playback.grid().cell(0, 0).unwrap(), &CellState::default());

        // The reset grid is usable again from the start
        playback.seek(1).unwrap();
        assert_eq!(playback.grid().cell(0, 0).unwrap().count, 1);
    }
}
