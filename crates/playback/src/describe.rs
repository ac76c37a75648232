use std::fmt;

use pxlog_engine::cell::{CellState, TIMESTAMP_FORMAT};
use pxlog_engine::Grid;

/// Inspector readout for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDescription {
    pub x: u32,
    pub y: u32,
    pub color_name: String,
    pub color_hex: String,
    pub state: CellState,
}

impl CellDescription {
    pub fn of(grid: &Grid, x: u32, y: u32) -> Option<Self> {
        let state = grid.cell(x, y)?.clone();
        let palette = grid.palette();
        Some(Self {
            x,
            y,
            color_name: palette.name(state.color_index).to_string(),
            color_hex: palette.color(state.color_index).to_hex(),
            state,
        })
    }

    pub fn last_time_text(&self) -> Option<String> {
        if self.state.is_virgin() {
            return None;
        }
        Some(self.state.last_time.format(TIMESTAMP_FORMAT).to_string())
    }
}

impl fmt::Display for CellDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "({}, {}) {} {}", self.x, self.y, self.color_name, self.color_hex)?;
        match self.last_time_text() {
            None => write!(f, "  Virgin pixel"),
            Some(time) => {
                writeln!(f, "  Actions: {}", self.state.count)?;
                writeln!(f, "  Last action: {}", self.state.last_kind)?;
                writeln!(f, "  Last time: {}", time)?;
                write!(f, "  Last fingerprint: {}", self.state.last_fingerprint)
            }
        }
    }
}
