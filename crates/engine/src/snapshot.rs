// ---------------------------------------------------------------------------
// snapshot - fixed-width on-disk encoding of a full canvas
// ---------------------------------------------------------------------------
//
// Cell record format v1 (112 bytes, little-endian):
//   [0..4]     count (u32)
//   [4..8]     color index (u32)
//   [8..16]    last timestamp, nanoseconds since the Unix epoch (i64)
//   [16..48]   last action kind, UTF-8, NUL padded
//   [48..112]  last fingerprint, UTF-8, NUL padded
//
// Cells are stored row-major (index = y * width + x), so a blob is exactly
// width * height * CELL_RECORD_SIZE bytes. The encoding is independent of
// the in-memory CellState layout.

use chrono::{DateTime, NaiveDateTime};

use crate::cell::{CellState, MAX_ACTION_KIND_LEN, MAX_FINGERPRINT_LEN};
use crate::error::{GridError, GridResult};

/// Version of the cell record layout. Bump on any layout change.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const COUNT_OFFSET: usize = 0;
const COLOR_OFFSET: usize = 4;
const TIME_OFFSET: usize = 8;
const KIND_OFFSET: usize = 16;
const FINGERPRINT_OFFSET: usize = KIND_OFFSET + MAX_ACTION_KIND_LEN;

/// Size of one encoded cell.
pub const CELL_RECORD_SIZE: usize = FINGERPRINT_OFFSET + MAX_FINGERPRINT_LEN;

/// Expected blob length for a canvas of the given size.
pub fn blob_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CELL_RECORD_SIZE
}

/// Encode cells (row-major) into a snapshot blob.
pub fn encode_cells(cells: &[CellState]) -> GridResult<Vec<u8>> {
    let mut out = vec![0u8; cells.len() * CELL_RECORD_SIZE];
    for (index, (cell, record)) in cells.iter().zip(out.chunks_exact_mut(CELL_RECORD_SIZE)).enumerate() {
        // Virgin cells stay all-zero
        if cell.is_virgin() {
            continue;
        }
        let nanos = cell.last_time.and_utc().timestamp_nanos_opt().ok_or_else(|| {
            GridError::SnapshotCell { index, reason: format!("timestamp {} out of range", cell.last_time) }
        })?;
        record[COUNT_OFFSET..COUNT_OFFSET + 4].copy_from_slice(&cell.count.to_le_bytes());
        record[COLOR_OFFSET..COLOR_OFFSET + 4].copy_from_slice(&cell.color_index.to_le_bytes());
        record[TIME_OFFSET..TIME_OFFSET + 8].copy_from_slice(&nanos.to_le_bytes());
        write_padded(&mut record[KIND_OFFSET..FINGERPRINT_OFFSET], &cell.last_kind)
            .map_err(|reason| GridError::SnapshotCell { index, reason })?;
        write_padded(&mut record[FINGERPRINT_OFFSET..CELL_RECORD_SIZE], &cell.last_fingerprint)
            .map_err(|reason| GridError::SnapshotCell { index, reason })?;
    }
    Ok(out)
}

/// Decode a snapshot blob holding exactly `cell_count` cells.
///
/// The whole blob is validated before anything is returned, so callers can
/// swap the result in atomically.
pub fn decode_cells(blob: &[u8], cell_count: usize) -> GridResult<Vec<CellState>> {
    let expected = cell_count * CELL_RECORD_SIZE;
    if blob.len() != expected {
        return Err(GridError::SnapshotSize { expected, actual: blob.len() });
    }

    let mut cells = Vec::with_capacity(cell_count);
    for (index, record) in blob.chunks_exact(CELL_RECORD_SIZE).enumerate() {
        let count = read_u32(record, COUNT_OFFSET);
        if count == 0 {
            cells.push(CellState::default());
            continue;
        }
        let nanos = i64::from_le_bytes(fixed(record, TIME_OFFSET));
        let last_time = nanos_to_datetime(nanos).ok_or_else(|| GridError::SnapshotCell {
            index,
            reason: format!("timestamp {nanos} out of range"),
        })?;
        let last_kind = read_padded(&record[KIND_OFFSET..FINGERPRINT_OFFSET])
            .map_err(|reason| GridError::SnapshotCell { index, reason })?;
        let last_fingerprint = read_padded(&record[FINGERPRINT_OFFSET..CELL_RECORD_SIZE])
            .map_err(|reason| GridError::SnapshotCell { index, reason })?;
        cells.push(CellState {
            count,
            color_index: read_u32(record, COLOR_OFFSET),
            last_kind,
            last_time,
            last_fingerprint,
        });
    }
    Ok(cells)
}

fn nanos_to_datetime(nanos: i64) -> Option<NaiveDateTime> {
    let secs = nanos.div_euclid(1_000_000_000);
    let subsec = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subsec).map(|dt| dt.naive_utc())
}

fn fixed<const N: usize>(record: &[u8], offset: usize) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&record[offset..offset + N]);
    buf
}

fn read_u32(record: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(fixed(record, offset))
}

fn write_padded(dest: &mut [u8], text: &str) -> Result<(), String> {
    let bytes = text.as_bytes();
    if bytes.len() > dest.len() {
        return Err(format!("'{text}' exceeds {} bytes", dest.len()));
    }
    if bytes.contains(&0) {
        return Err(format!("'{text}' contains a NUL byte"));
    }
    dest[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

fn read_padded(src: &[u8]) -> Result<String, String> {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    std::str::from_utf8(&src[..end])
        .map(str::to_owned)
        .map_err(|e| format!("invalid UTF-8: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::parse_timestamp;

    fn painted(count: u32, color: u32) -> CellState {
        CellState {
            count,
            color_index: color,
            last_kind: "user place".to_string(),
            last_time: parse_timestamp("2021-04-10 12:34:56.123456789").unwrap(),
            last_fingerprint: "f".repeat(MAX_FINGERPRINT_LEN),
        }
    }

    #[test]
    fn test_cell_record_size() {
        assert_eq!(CELL_RECORD_SIZE, 112);
        assert_eq!(blob_len(5, 3), 15 * 112);
    }

    #[test]
    fn test_virgin_cells_encode_as_zeros() {
        let blob = encode_cells(&[CellState::default(), CellState::default()]).unwrap();
        assert_eq!(blob.len(), 2 * CELL_RECORD_SIZE);
        assert!(blob.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_decode_preserves_nanoseconds_and_strings() {
        let cells = vec![painted(4, 9), CellState::default()];
        let blob = encode_cells(&cells).unwrap();
        let decoded = decode_cells(&blob, 2).unwrap();
        assert_eq!(decoded, cells);
    }

    #[test]
    fn test_decode_zero_count_ignores_other_bytes() {
        let mut blob = encode_cells(&[painted(1, 3)]).unwrap();
        blob[COUNT_OFFSET..COUNT_OFFSET + 4].copy_from_slice(&0u32.to_le_bytes());
        let decoded = decode_cells(&blob, 1).unwrap();
        assert_eq!(decoded[0], CellState::default());
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let err = decode_cells(&[0u8; 10], 1).unwrap_err();
        assert_eq!(err, GridError::SnapshotSize { expected: CELL_RECORD_SIZE, actual: 10 });
    }

    #[test]
    fn test_encode_rejects_oversized_kind() {
        let mut cell = painted(1, 0);
        cell.last_kind = "k".repeat(MAX_ACTION_KIND_LEN + 1);
        assert!(matches!(encode_cells(&[cell]), Err(GridError::SnapshotCell { index: 0, .. })));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let mut blob = encode_cells(&[painted(1, 0)]).unwrap();
        blob[KIND_OFFSET] = 0xFF;
        assert!(matches!(decode_cells(&blob, 1), Err(GridError::SnapshotCell { .. })));
    }
}
