pub mod cell;
pub mod error;
pub mod grid;
pub mod palette;
pub mod snapshot;

pub use cell::{ActionFields, CellState, Direction};
pub use error::{GridError, GridResult};
pub use grid::{canvas_cells, Grid, MAX_CANVAS_CELLS};
pub use palette::{Palette, PaletteColor, Rgb};
