//! The playfield: a fixed `width × height` matrix of cells.
//!
//! Coordinates are `(x, y)` with `x` growing to the right and `y` growing
//! downwards; row 0 is the top of the visible field. Signed coordinates are
//! accepted so that pieces partially above the field can be queried directly.

use std::fmt;

use crate::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_DIMENSION};
use crate::error::{GameError, Result};
use crate::piece::PieceKind;

// ============================================================================
// CellState
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CellState {
    #[default]
    Empty,
    Filled(PieceKind),
}

/// Text glyph per colour id, `0` (empty) through `7`.
const PATTERNS: [char; 8] = [' ', '#', '%', '&', '@', '$', '8', 'X'];

impl CellState {
    pub fn is_empty(self) -> bool {
        self == CellState::Empty
    }

    pub fn is_filled(self) -> bool {
        !self.is_empty()
    }

    /// `0` for empty, `1..=7` for the piece kind occupying the cell.
    pub fn color_id(self) -> u8 {
        match self {
            CellState::Empty => 0,
            CellState::Filled(kind) => kind.color_id(),
        }
    }

    pub fn glyph(self) -> char {
        PATTERNS[self.color_id() as usize]
    }
}

impl TryFrom<u8> for CellState {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self> {
        if value == 0 {
            return Ok(CellState::Empty);
        }
        PieceKind::from_color_id(value)
            .map(CellState::Filled)
            .ok_or(GameError::InvalidCellValue(value))
    }
}

impl From<CellState> for u8 {
    fn from(cell: CellState) -> Self {
        cell.color_id()
    }
}

// ============================================================================
// Grid
// ============================================================================

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<CellState>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(GameError::InvalidConfiguration(format!(
                "grid dimensions {width}x{height} must be within 1..={MAX_DIMENSION}"
            )));
        }
        Ok(Self {
            width,
            height,
            cells: vec![vec![CellState::Empty; width]; height],
        })
    }

    /// Builds a grid from explicit rows. All rows must share one non-zero width.
    pub fn from_rows(rows: Vec<Vec<CellState>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        let mut grid = Self::new(width, rows.len())?;
        if rows.iter().any(|row| row.len() != width) {
            return Err(GameError::InvalidConfiguration(
                "grid rows must all have the same width".to_string(),
            ));
        }
        grid.cells = rows;
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> &[Vec<CellState>] {
        &self.cells
    }

    fn index(&self, x: i16, y: i16) -> Option<(usize, usize)> {
        let (col, row) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        (col < self.width && row < self.height).then_some((col, row))
    }

    fn out_of_bounds(&self, x: i16, y: i16) -> GameError {
        GameError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn contains(&self, x: i16, y: i16) -> bool {
        self.index(x, y).is_some()
    }

    pub fn get(&self, x: i16, y: i16) -> Result<CellState> {
        let (col, row) = self.index(x, y).ok_or_else(|| self.out_of_bounds(x, y))?;
        Ok(self.cells[row][col])
    }

    pub fn set_cell(&mut self, x: i16, y: i16, value: CellState) -> Result<()> {
        let (col, row) = self.index(x, y).ok_or_else(|| self.out_of_bounds(x, y))?;
        self.cells[row][col] = value;
        Ok(())
    }

    /// Writes `value` only into an in-bounds, empty cell. Returns whether it wrote.
    pub fn fill_if_empty(&mut self, x: i16, y: i16, value: CellState) -> bool {
        match self.index(x, y) {
            Some((col, row)) if self.cells[row][col].is_empty() => {
                self.cells[row][col] = value;
                true
            }
            _ => false,
        }
    }

    /// In bounds and empty.
    pub fn is_free(&self, x: i16, y: i16) -> bool {
        matches!(self.get(x, y), Ok(CellState::Empty))
    }

    pub fn is_row_full(&self, y: usize) -> bool {
        self.cells.get(y).is_some_and(|row| row_is_full(row))
    }

    /// Removes every full row and drops the rows above it.
    ///
    /// Surviving rows keep their relative order; one empty row is prepended at
    /// the top for each row removed. Returns the number of rows removed.
    pub fn clear_full_rows(&mut self) -> u32 {
        let before = self.cells.len();
        self.cells.retain(|row| !row_is_full(row));
        let cleared = before - self.cells.len();

        if cleared > 0 {
            let mut compacted = vec![vec![CellState::Empty; self.width]; cleared];
            compacted.append(&mut self.cells);
            self.cells = compacted;
        }

        cleared as u32
    }

    pub fn reset(&mut self) {
        for row in &mut self.cells {
            row.fill(CellState::Empty);
        }
    }

    pub fn filled_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_filled())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }
}

fn row_is_full(row: &[CellState]) -> bool {
    row.iter().all(|cell| cell.is_filled())
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            cells: vec![vec![CellState::Empty; DEFAULT_WIDTH]; DEFAULT_HEIGHT],
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: String = row.iter().map(|cell| cell.glyph()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
