// Raw pxls-style action log reader
//
// One action per line, six tab-separated fields:
//   timestamp  fingerprint  x  y  color_index  action_kind
// The timestamp uses a comma before the fractional seconds
// (`2021-04-10 12:34:56,789`); it is rewritten to the canonical period form.
// Empty lines are rejected, except at the end of the file.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use pxlog_engine::cell::{parse_timestamp, MAX_ACTION_KIND_LEN, MAX_FINGERPRINT_LEN};
use pxlog_engine::{canvas_cells, MAX_CANVAS_CELLS};

use crate::error::{StoreError, StoreResult};

/// Number of tab-separated fields per raw line.
pub const RAW_FIELD_COUNT: usize = 6;

/// One parsed raw log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAction {
    /// Canonical timestamp text, as stored
    pub timestamp_text: String,
    pub timestamp: NaiveDateTime,
    pub fingerprint: String,
    pub x: u32,
    pub y: u32,
    pub color_index: u32,
    pub action_kind: String,
}

/// Rewrite the last comma of a raw timestamp into a period.
pub fn canonical_timestamp(raw: &str) -> String {
    match raw.rfind(',') {
        Some(pos) => {
            let mut out = String::with_capacity(raw.len());
            out.push_str(&raw[..pos]);
            out.push('.');
            out.push_str(&raw[pos + 1..]);
            out
        }
        None => raw.to_string(),
    }
}

/// Parse the fields of one raw line. `line` is 1-based, for error messages.
pub fn parse_fields(fields: &csv::StringRecord, line: u64) -> StoreResult<RawAction> {
    let malformed = |reason: String| StoreError::Malformed { line, reason };

    if fields.len() != RAW_FIELD_COUNT {
        return Err(malformed(format!("expected {RAW_FIELD_COUNT} fields, found {}", fields.len())));
    }

    let timestamp_text = canonical_timestamp(&fields[0]);
    let timestamp = parse_timestamp(&timestamp_text)
        .filter(|ts| ts.and_utc().timestamp_nanos_opt().is_some())
        .ok_or_else(|| malformed(format!("invalid timestamp '{}'", &fields[0])))?;

    let fingerprint = fields[1].to_string();
    if fingerprint.len() > MAX_FINGERPRINT_LEN {
        return Err(malformed(format!("fingerprint longer than {MAX_FINGERPRINT_LEN} bytes")));
    }

    let number = |index: usize, name: &str| -> StoreResult<u32> {
        fields[index]
            .trim()
            .parse::<u32>()
            .map_err(|_| malformed(format!("{name} '{}' is not an unsigned integer", &fields[index])))
    };
    let x = number(2, "x")?;
    let y = number(3, "y")?;
    let color_index = number(4, "color index")?;

    let action_kind = fields[5].to_string();
    if action_kind.len() > MAX_ACTION_KIND_LEN {
        return Err(malformed(format!("action kind longer than {MAX_ACTION_KIND_LEN} bytes")));
    }
    // Snapshots NUL-pad text fields
    if fingerprint.contains('\0') || action_kind.contains('\0') {
        return Err(malformed("NUL byte in text field".to_string()));
    }

    Ok(RawAction { timestamp_text, timestamp, fingerprint, x, y, color_index, action_kind })
}

/// Byte source that notes where empty lines start.
///
/// The csv reader silently skips empty lines, so they are found here and
/// matched against record positions afterwards.
struct LineScan<R> {
    inner: R,
    offset: u64,
    line: u64,
    line_start: u64,
    line_empty: bool,
    /// (byte offset, 1-based line) of each empty line not yet reported
    empty_lines: VecDeque<(u64, u64)>,
}

impl<R: Read> LineScan<R> {
    fn new(inner: R) -> Self {
        Self { inner, offset: 0, line: 1, line_start: 0, line_empty: true, empty_lines: VecDeque::new() }
    }

    /// First empty line starting before `end`, the byte position after a record.
    fn empty_line_before(&self, end: u64) -> Option<u64> {
        self.empty_lines.front().filter(|(start, _)| *start < end).map(|(_, line)| *line)
    }
}

impl<R: Read> Read for LineScan<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for &byte in &buf[..n] {
            match byte {
                b'\n' => {
                    if self.line_empty {
                        self.empty_lines.push_back((self.line_start, self.line));
                    }
                    self.line += 1;
                    self.line_start = self.offset + 1;
                    self.line_empty = true;
                }
                b'\r' => {}
                _ => self.line_empty = false,
            }
            self.offset += 1;
        }
        Ok(n)
    }
}

/// Streaming reader over a raw log.
pub struct RawLogReader<R: Read> {
    reader: csv::Reader<LineScan<R>>,
    record: csv::StringRecord,
    /// Canvas size implied by the coordinates read so far
    width: u64,
    height: u64,
}

impl RawLogReader<File> {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Err(StoreError::IsDirectory(path.to_path_buf()));
        }
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> RawLogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(LineScan::new(source));
        Self { reader, record: csv::StringRecord::new(), width: 0, height: 0 }
    }

    /// Canvas size implied by the coordinates read so far.
    pub fn extent(&self) -> (u64, u64) {
        (self.width, self.height)
    }

    /// Read the next action, or `None` at end of input.
    pub fn next_action(&mut self) -> StoreResult<Option<RawAction>> {
        let more = self.reader.read_record(&mut self.record).map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            match e.into_kind() {
                csv::ErrorKind::Io(io) => StoreError::Io(io),
                other => StoreError::Malformed { line, reason: format!("{other:?}") },
            }
        })?;
        if !more {
            return Ok(None);
        }
        if let Some(line) = self.reader.get_ref().empty_line_before(self.reader.position().byte()) {
            return Err(StoreError::Malformed { line, reason: "empty line".to_string() });
        }
        let line = self.record.position().map(|p| p.line()).unwrap_or(0);
        let action = parse_fields(&self.record, line)?;
        self.grow_canvas(&action, line)?;
        Ok(Some(action))
    }

    fn grow_canvas(&mut self, action: &RawAction, line: u64) -> StoreResult<()> {
        let width = self.width.max(u64::from(action.x) + 1);
        let height = self.height.max(u64::from(action.y) + 1);
        if canvas_cells(width, height).is_none() {
            return Err(StoreError::Malformed {
                line,
                reason: format!(
                    "cell ({}, {}) grows the canvas to {width}x{height}, over {MAX_CANVAS_CELLS} cells",
                    action.x, action.y
                ),
            });
        }
        self.width = width;
        self.height = height;
        Ok(())
    }
}

impl<R: Read> Iterator for RawLogReader<R> {
    type Item = StoreResult<RawAction>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_action().transpose()
    }
}
