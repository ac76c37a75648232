use crate::cell::{ActionFields, CellState, Direction};
use crate::error::{GridError, GridResult};
use crate::palette::{Palette, Rgb};
use crate::snapshot;

/// Largest canvas, in cells, a grid may be built for.
pub const MAX_CANVAS_CELLS: u64 = 1 << 24;

/// Cell count of a `width` x `height` canvas, if it stays within `MAX_CANVAS_CELLS`.
pub fn canvas_cells(width: u64, height: u64) -> Option<u64> {
    width.checked_mul(height).filter(|&cells| cells <= MAX_CANVAS_CELLS)
}

/// Materialized canvas: one `CellState` per coordinate, row-major.
///
/// The grid does no I/O. It is mutated only through `perform_action`,
/// `clear_canvas` and `load_snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<CellState>,
    palette: Palette,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![CellState::default(); width as usize * height as usize],
            palette: Palette::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&CellState> {
        if !self.contains(x, y) {
            return None;
        }
        self.cells.get(self.index(x, y))
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Palette color of a cell (fallback color for unknown indices).
    pub fn color_at(&self, x: u32, y: u32) -> Option<Rgb> {
        self.cell(x, y).map(|c| self.palette.color(c.color_index))
    }

    /// Number of non-virgin cells.
    pub fn painted_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_virgin()).count()
    }

    /// Apply one action to a cell.
    ///
    /// Forward: count += 1 and the supplied fields are required.
    /// Backward: count -= 1 (floored at 0). Reaching 0 reverts the cell to
    /// virgin whatever was supplied; otherwise the supplied fields are the
    /// cell's prior state and are required.
    pub fn perform_action(
        &mut self,
        x: u32,
        y: u32,
        direction: Direction,
        fields: Option<&ActionFields>,
    ) -> GridResult<()> {
        if !self.contains(x, y) {
            return Err(GridError::OutOfBounds { x, y, width: self.width, height: self.height });
        }
        let index = self.index(x, y);

        match direction {
            Direction::Forward => {
                let fields = fields.ok_or(GridError::MissingFields { x, y })?;
                let cell = &mut self.cells[index];
                cell.count = cell.count.saturating_add(1);
                cell.assign(fields);
            }
            Direction::Backward => {
                let remaining = self.cells[index].count.saturating_sub(1);
                if remaining == 0 {
                    self.cells[index] = CellState::default();
                    return Ok(());
                }
                let fields = fields.ok_or(GridError::BrokenChain { x, y, count: remaining })?;
                let cell = &mut self.cells[index];
                cell.count = remaining;
                cell.assign(fields);
            }
        }
        Ok(())
    }

    /// Reset every cell to virgin.
    pub fn clear_canvas(&mut self) {
        self.cells.fill(CellState::default());
    }

    /// Replace every cell from a snapshot blob.
    ///
    /// Nothing changes unless the whole blob decodes.
    pub fn load_snapshot(&mut self, blob: &[u8]) -> GridResult<()> {
        self.cells = snapshot::decode_cells(blob, self.cells.len())?;
        Ok(())
    }

    /// Encode the current cells as a snapshot blob.
    pub fn encode_snapshot(&self) -> GridResult<Vec<u8>> {
        snapshot::encode_cells(&self.cells)
    }
}
