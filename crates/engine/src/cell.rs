use chrono::NaiveDateTime;

/// Canonical timestamp layout stored in the log (period as fractional separator).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Maximum byte length of an action kind label (fixed width in snapshots).
pub const MAX_ACTION_KIND_LEN: usize = 32;

/// Maximum byte length of a user fingerprint (fixed width in snapshots).
pub const MAX_FINGERPRINT_LEN: usize = 64;

/// Which way a record is applied to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Redo: the record's own fields become the cell's state.
    Forward,
    /// Undo: the record is reverted, restoring its predecessor's fields.
    Backward,
}

/// The per-record payload a cell takes on when an action is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFields {
    pub timestamp: NaiveDateTime,
    pub fingerprint: String,
    pub color_index: u32,
    pub action_kind: String,
}

impl ActionFields {
    pub fn new(
        timestamp: NaiveDateTime,
        fingerprint: impl Into<String>,
        color_index: u32,
        action_kind: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            fingerprint: fingerprint.into(),
            color_index,
            action_kind: action_kind.into(),
        }
    }
}

/// Parse a canonical timestamp (`2021-04-10 12:34:56.789`).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

/// Materialized state of one canvas cell.
///
/// `count == 0` marks a virgin cell; the remaining fields are defaults then.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellState {
    /// Number of times the cell has been painted since it was last virgin
    pub count: u32,
    pub color_index: u32,
    pub last_kind: String,
    pub last_time: NaiveDateTime,
    pub last_fingerprint: String,
}

impl CellState {
    pub fn is_virgin(&self) -> bool {
        self.count == 0
    }

    /// Overwrite everything but the count with an action's fields.
    pub(crate) fn assign(&mut self, fields: &ActionFields) {
        self.color_index = fields.color_index;
        self.last_kind.clone_from(&fields.action_kind);
        self.last_time = fields.timestamp;
        self.last_fingerprint.clone_from(&fields.fingerprint);
    }
}
