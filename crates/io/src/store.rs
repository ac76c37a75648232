// Indexed action log store (.logdb) using SQLite
//
// The raw log is converted once into a `log` table keyed by a synthetic id
// (1..N in file order). Every row carries `prev_id`, the id of the previous
// row on the same cell, so a backward replay can restore prior cell state
// without scanning unrelated cells. Full-canvas snapshots live in the
// `snapshot` table as opaque blobs keyed by log id.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use pxlog_engine::cell::{parse_timestamp, ActionFields, Direction};
use pxlog_engine::snapshot::SNAPSHOT_FORMAT_VERSION;
use pxlog_engine::{canvas_cells, MAX_CANVAS_CELLS};

use crate::error::{StoreError, StoreResult};
use crate::raw::{RawAction, RawLogReader};

/// Store format version.
/// Increment when the schema changes in a way that old versions can't read.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// File extension of converted stores.
pub const STORE_EXTENSION: &str = "logdb";

/// Rows per multi-row INSERT during conversion.
pub const INSERT_BATCH_SIZE: usize = 150;

const LOG_COLUMNS: usize = 8;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS log (
    id INTEGER PRIMARY KEY,             -- 1..N in raw file order
    prev_id INTEGER REFERENCES log(id), -- previous action on the same (x, y), NULL if first
    date TEXT NOT NULL,                 -- canonical timestamp (period before fraction)
    hash TEXT NOT NULL,                 -- user fingerprint
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    color_index INTEGER NOT NULL,
    action TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS snapshot (
    id INTEGER PRIMARY KEY,             -- log id the canvas was captured at
    data BLOB NOT NULL
);
"#;

const FORWARD_QUERY: &str = "SELECT id, x, y, date, hash, color_index, action \
     FROM log WHERE id > ?1 AND id <= ?2 ORDER BY id ASC";

// Each backward row carries its predecessor's fields (NULL when the row was
// the first action on its cell).
const BACKWARD_QUERY: &str = "SELECT l.id, l.x, l.y, l.prev_id, p.date, p.hash, p.color_index, p.action \
     FROM log AS l LEFT JOIN log AS p ON p.id = l.prev_id \
     WHERE l.id > ?1 AND l.id <= ?2 ORDER BY l.id DESC";

/// Canvas dimensions and record count, computed once per open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogMeta {
    pub width: u32,
    pub height: u32,
    pub record_count: u64,
}

/// A full stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub id: u64,
    pub previous_at_cell: Option<u64>,
    pub x: u32,
    pub y: u32,
    pub fields: ActionFields,
}

/// One record emitted by `LogStore::query_records`.
///
/// Forward records carry their own fields. Backward records carry the fields
/// of their `previous_at_cell` record, or `None` when reverting the cell's
/// first action (the cell becomes virgin).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRecord {
    pub id: u64,
    pub x: u32,
    pub y: u32,
    pub direction: Direction,
    pub fields: Option<ActionFields>,
}

pub struct LogStore {
    conn: Connection,
    path: PathBuf,
    meta: LogMeta,
    cursor: u64,
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("path", &self.path)
            .field("meta", &self.meta)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Default store location for a raw log: same directory, `.logdb` extension.
pub fn store_path_for(raw: &Path) -> PathBuf {
    raw.with_extension(STORE_EXTENSION)
}

fn partial_path(out: &Path) -> PathBuf {
    let mut name = out.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

struct PendingRow {
    id: u64,
    prev: Option<u64>,
    action: RawAction,
}

impl LogStore {
    /// Convert a raw log into a store next to it (`<stem>.logdb`).
    pub fn convert(raw: &Path) -> StoreResult<Self> {
        Self::convert_to(raw, &store_path_for(raw))
    }

    /// Convert a raw log into a store at `out`.
    ///
    /// The store is built at `<out>.partial` and only renamed over `out`
    /// once every line has been ingested; on any failure the partial file is
    /// deleted and an existing store at `out` is left as it was.
    pub fn convert_to(raw: &Path, out: &Path) -> StoreResult<Self> {
        let mut reader = RawLogReader::open(raw)?;
        if out.is_dir() {
            return Err(StoreError::IsDirectory(out.to_path_buf()));
        }

        let partial = partial_path(out);
        if partial.exists() {
            fs::remove_file(&partial)?;
        }

        log::info!("Converting {} into {}", raw.display(), out.display());
        let ingested = match build(&mut reader, &partial) {
            Ok(count) => count,
            Err(e) => {
                discard(&partial);
                log::warn!("Conversion of {} failed: {}", raw.display(), e);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial, out) {
            discard(&partial);
            return Err(e.into());
        }
        log::info!("Ingested {} records into {}", ingested, out.display());

        Self::open(out)
    }

    /// Open an existing store read-write (snapshots are written back).
    pub fn open(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Err(StoreError::IsDirectory(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        check_schema(&conn)?;
        let meta = query_meta(&conn)?;

        log::info!(
            "Opened {} ({}x{}, {} records)",
            path.display(),
            meta.width,
            meta.height,
            meta.record_count
        );

        Ok(Self { conn, path: path.to_path_buf(), meta, cursor: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> LogMeta {
        self.meta
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn record_count(&self) -> u64 {
        self.meta.record_count
    }

    /// Id of the last record applied by the consumer (0 = virgin canvas).
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Move the cursor without emitting records (after a snapshot jump).
    pub fn seek(&mut self, id: u64) -> StoreResult<()> {
        self.check_target(id)?;
        self.cursor = id;
        Ok(())
    }

    fn check_target(&self, target: u64) -> StoreResult<()> {
        if target > self.meta.record_count {
            return Err(StoreError::OutOfRange { target, total: self.meta.record_count });
        }
        Ok(())
    }

    /// Emit the records between the cursor and `target`, then move the cursor.
    ///
    /// Forward (`target > cursor`): ids in `(cursor, target]` ascending.
    /// Backward (`target < cursor`): ids in `(target, cursor]` descending,
    /// each carrying its predecessor's fields.
    ///
    /// Returns the number of records emitted. If the target is out of range,
    /// a row cannot be read, or `on_record` fails, the cursor is unchanged.
    pub fn query_records<F, E>(&mut self, target: u64, mut on_record: F) -> Result<u64, E>
    where
        F: FnMut(ReplayRecord) -> Result<(), E>,
        E: From<StoreError>,
    {
        self.check_target(target)?;
        let cursor = self.cursor;
        if target == cursor {
            return Ok(0);
        }

        let emitted = {
            let (sql, direction, low, high) = if target > cursor {
                (FORWARD_QUERY, Direction::Forward, cursor, target)
            } else {
                (BACKWARD_QUERY, Direction::Backward, target, cursor)
            };
            let mut stmt = self.conn.prepare_cached(sql).map_err(StoreError::from)?;
            let mut rows = stmt.query(params![low, high]).map_err(StoreError::from)?;

            let mut emitted = 0u64;
            while let Some(row) = rows.next().map_err(StoreError::from)? {
                let record = match direction {
                    Direction::Forward => forward_record(row)?,
                    Direction::Backward => backward_record(row)?,
                };
                on_record(record)?;
                emitted += 1;
            }
            emitted
        };

        log::debug!("Replayed {} records ({} -> {})", emitted, cursor, target);
        self.cursor = target;
        Ok(emitted)
    }

    /// Fetch one record by id.
    pub fn record(&self, id: u64) -> StoreResult<Option<ActionRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, prev_id, x, y, date, hash, color_index, action FROM log WHERE id = ?1",
        )?;
        let raw = stmt
            .query_row(params![id], |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, Option<u64>>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .optional()?;

        let Some((id, previous_at_cell, x, y, date, hash, color_index, action)) = raw else {
            return Ok(None);
        };
        let fields = to_fields(id, &date, hash, color_index, action)?;
        Ok(Some(ActionRecord { id, previous_at_cell, x, y, fields }))
    }

    /// Re-derive every `prev_id` and compare it with what is stored.
    ///
    /// Also checks that ids run exactly 1..N. Returns the number of records
    /// checked.
    pub fn verify_chain(&self) -> StoreResult<u64> {
        let mut stmt = self.conn.prepare("SELECT id, prev_id, x, y FROM log ORDER BY id ASC")?;
        let mut rows = stmt.query([])?;
        let mut last_at_cell: HashMap<(u32, u32), u64> = HashMap::new();
        let mut expected_id = 1u64;

        while let Some(row) = rows.next()? {
            let id: u64 = row.get(0)?;
            let prev: Option<u64> = row.get(1)?;
            let x: u32 = row.get(2)?;
            let y: u32 = row.get(3)?;

            if id != expected_id {
                return Err(StoreError::Corrupt(format!("expected id {expected_id}, found {id}")));
            }
            let derived = last_at_cell.insert((x, y), id);
            if derived != prev {
                return Err(StoreError::Corrupt(format!(
                    "record {id} at ({x}, {y}) links to {prev:?}, expected {derived:?}"
                )));
            }
            expected_id += 1;
        }

        let checked = expected_id - 1;
        if checked != self.meta.record_count {
            return Err(StoreError::Corrupt(format!(
                "checked {checked} records but the store reports {}",
                self.meta.record_count
            )));
        }
        Ok(checked)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Ids of all persisted snapshots, ascending. Id 0 is implicit and never listed.
    pub fn snapshot_ids(&self) -> StoreResult<Vec<u64>> {
        let mut stmt = self.conn.prepare_cached("SELECT id FROM snapshot ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, u64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Snapshot blob captured at `id`, if any.
    pub fn snapshot(&self, id: u64) -> StoreResult<Option<Vec<u8>>> {
        let mut stmt = self.conn.prepare_cached("SELECT data FROM snapshot WHERE id = ?1")?;
        Ok(stmt.query_row(params![id], |row| row.get::<_, Vec<u8>>(0)).optional()?)
    }

    /// Create or overwrite the snapshot at `id` (1..=record_count).
    pub fn put_snapshot(&mut self, id: u64, blob: &[u8]) -> StoreResult<()> {
        if id == 0 {
            return Err(StoreError::OutOfRange { target: 0, total: self.meta.record_count });
        }
        self.check_target(id)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshot (id, data) VALUES (?1, ?2)",
            params![id, blob],
        )?;
        log::debug!("Stored snapshot at {} ({} bytes)", id, blob.len());
        Ok(())
    }

    /// Remove the snapshot at `id`. Returns whether one existed.
    pub fn delete_snapshot(&mut self, id: u64) -> StoreResult<bool> {
        let removed = self.conn.execute("DELETE FROM snapshot WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

fn discard(partial: &Path) {
    if partial.exists() {
        if let Err(e) = fs::remove_file(partial) {
            log::warn!("Could not remove partial store {}: {}", partial.display(), e);
        }
    }
}

fn build(reader: &mut RawLogReader<File>, path: &Path) -> StoreResult<u64> {
    let mut conn = Connection::open(path)?;
    // The partial file is thrown away on failure, so durability is not needed yet
    conn.pragma_update(None, "synchronous", "OFF")?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)",
        params!["format_version", STORE_FORMAT_VERSION.to_string()],
    )?;
    tx.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)",
        params!["snapshot_format", SNAPSHOT_FORMAT_VERSION.to_string()],
    )?;

    let mut last_at_cell: HashMap<(u32, u32), u64> = HashMap::new();
    let mut batch: Vec<PendingRow> = Vec::with_capacity(INSERT_BATCH_SIZE);
    let mut next_id = 1u64;

    for action in reader {
        let action = action?;
        let id = next_id;
        next_id += 1;
        let prev = last_at_cell.insert((action.x, action.y), id);
        batch.push(PendingRow { id, prev, action });

        if batch.len() == INSERT_BATCH_SIZE {
            insert_batch(&tx, &batch)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        insert_batch(&tx, &batch)?;
    }

    tx.commit()?;
    Ok(next_id - 1)
}

fn batch_insert_sql(rows: usize) -> String {
    let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?, ?)"; rows].join(", ");
    format!("INSERT INTO log (id, prev_id, date, hash, x, y, color_index, action) VALUES {placeholders}")
}

fn insert_batch(conn: &Connection, batch: &[PendingRow]) -> StoreResult<()> {
    let mut stmt = conn.prepare_cached(&batch_insert_sql(batch.len()))?;
    let mut values: Vec<&dyn ToSql> = Vec::with_capacity(batch.len() * LOG_COLUMNS);
    for row in batch {
        values.push(&row.id);
        values.push(&row.prev);
        values.push(&row.action.timestamp_text);
        values.push(&row.action.fingerprint);
        values.push(&row.action.x);
        values.push(&row.action.y);
        values.push(&row.action.color_index);
        values.push(&row.action.action_kind);
    }
    stmt.execute(values.as_slice())?;
    log::debug!("Inserted batch ending at id {}", batch.last().map(|r| r.id).unwrap_or(0));
    Ok(())
}

fn check_schema(conn: &Connection) -> StoreResult<()> {
    let incompatible = |what: &str, e: rusqlite::Error| StoreError::Incompatible(format!("{what}: {e}"));

    let version: Option<String> = conn
        .query_row("SELECT value FROM meta WHERE key = 'format_version'", [], |row| row.get(0))
        .optional()
        .map_err(|e| incompatible("no meta table", e))?;
    let version: u32 = version
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| StoreError::Incompatible("missing format version".to_string()))?;
    if version > STORE_FORMAT_VERSION {
        return Err(StoreError::Incompatible(format!(
            "store format {version} is newer than supported format {STORE_FORMAT_VERSION}"
        )));
    }

    let snapshot_format: Option<String> = conn
        .query_row("SELECT value FROM meta WHERE key = 'snapshot_format'", [], |row| row.get(0))
        .optional()
        .map_err(|e| incompatible("meta", e))?;
    if snapshot_format.as_deref() != Some(SNAPSHOT_FORMAT_VERSION.to_string().as_str()) {
        return Err(StoreError::Incompatible(format!(
            "snapshot format {:?} does not match {SNAPSHOT_FORMAT_VERSION}",
            snapshot_format
        )));
    }

    // Probe the required columns
    conn.prepare("SELECT id, prev_id, date, hash, x, y, color_index, action FROM log LIMIT 1")
        .map_err(|e| incompatible("log table", e))?;
    conn.prepare("SELECT id, data FROM snapshot LIMIT 1")
        .map_err(|e| incompatible("snapshot table", e))?;
    Ok(())
}

fn query_meta(conn: &Connection) -> StoreResult<LogMeta> {
    let (max_x, max_y, count): (Option<u32>, Option<u32>, u64) = conn.query_row(
        "SELECT MAX(x), MAX(y), COUNT(*) FROM log",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    let extent = |max: Option<u32>| max.map_or(Some(0), |m| m.checked_add(1));
    let (Some(width), Some(height)) = (extent(max_x), extent(max_y)) else {
        return Err(StoreError::Corrupt("coordinate at the u32 limit".to_string()));
    };
    if canvas_cells(u64::from(width), u64::from(height)).is_none() {
        return Err(StoreError::Corrupt(format!("{width}x{height} canvas exceeds {MAX_CANVAS_CELLS} cells")));
    }
    Ok(LogMeta { width, height, record_count: count })
}

fn to_fields(id: u64, date: &str, hash: String, color_index: u32, action: String) -> StoreResult<ActionFields> {
    let timestamp = parse_timestamp(date)
        .ok_or_else(|| StoreError::Corrupt(format!("record {id} has invalid timestamp '{date}'")))?;
    Ok(ActionFields::new(timestamp, hash, color_index, action))
}

fn forward_record(row: &Row<'_>) -> StoreResult<ReplayRecord> {
    let id: u64 = row.get(0)?;
    let date: String = row.get(3)?;
    let fields = to_fields(id, &date, row.get(4)?, row.get(5)?, row.get(6)?)?;
    Ok(ReplayRecord { id, x: row.get(1)?, y: row.get(2)?, direction: Direction::Forward, fields: Some(fields) })
}

fn backward_record(row: &Row<'_>) -> StoreResult<ReplayRecord> {
    let id: u64 = row.get(0)?;
    let prev_id: Option<u64> = row.get(3)?;
    let date: Option<String> = row.get(4)?;

    let fields = match (prev_id, date) {
        (None, _) => None,
        (Some(prev), Some(date)) => Some(to_fields(prev, &date, row.get(5)?, row.get(6)?, row.get(7)?)?),
        (Some(prev), None) => {
            return Err(StoreError::Corrupt(format!("record {id} links to missing record {prev}")));
        }
    };
    Ok(ReplayRecord { id, x: row.get(1)?, y: row.get(2)?, direction: Direction::Backward, fields })
}
