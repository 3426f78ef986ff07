use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::MAX_DIMENSION;
use crate::grid::{CellState, Grid};

// ============================================================================
// Configuration
// ============================================================================

/// Side length of every piece's bounding box.
pub const SHAPE_SIZE: usize = 4;

/// Row the bounding box starts on when a piece is spawned; the top of the box
/// hangs above the visible field so the piece enters on its first fall.
pub const SPAWN_ROW: i16 = -1;

pub type Shape = [[CellState; SHAPE_SIZE]; SHAPE_SIZE];

type Mask = [[u8; SHAPE_SIZE]; SHAPE_SIZE];

const MASK_I: Mask = [[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]];
const MASK_O: Mask = [[0, 0, 0, 0], [0, 1, 1, 0], [0, 1, 1, 0], [0, 0, 0, 0]];
const MASK_J: Mask = [[0, 0, 0, 0], [0, 1, 1, 1], [0, 0, 0, 1], [0, 0, 0, 0]];
const MASK_L: Mask = [[0, 0, 0, 0], [1, 1, 1, 0], [1, 0, 0, 0], [0, 0, 0, 0]];
const MASK_S: Mask = [[0, 0, 0, 0], [0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0]];
const MASK_Z: Mask = [[0, 0, 0, 0], [0, 1, 1, 0], [0, 0, 1, 1], [0, 0, 0, 0]];
const MASK_T: Mask = [[0, 0, 0, 0], [1, 1, 1, 0], [0, 1, 0, 0], [0, 0, 0, 0]];

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PieceKind {
    I,
    O,
    J,
    L,
    S,
    Z,
    T,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::J,
        PieceKind::L,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::T,
    ];

    /// Colour id `1..=7`, also the cell value stored in the grid.
    pub fn color_id(self) -> u8 {
        match self {
            PieceKind::I => 1,
            PieceKind::O => 2,
            PieceKind::J => 3,
            PieceKind::L => 4,
            PieceKind::S => 5,
            PieceKind::Z => 6,
            PieceKind::T => 7,
        }
    }

    pub fn from_color_id(id: u8) -> Option<Self> {
        let index = usize::from(id).checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// The kind's canonical spawn orientation.
    pub fn spawn_shape(self) -> Shape {
        let mask = match self {
            PieceKind::I => &MASK_I,
            PieceKind::O => &MASK_O,
            PieceKind::J => &MASK_J,
            PieceKind::L => &MASK_L,
            PieceKind::S => &MASK_S,
            PieceKind::Z => &MASK_Z,
            PieceKind::T => &MASK_T,
        };
        let mut shape = [[CellState::Empty; SHAPE_SIZE]; SHAPE_SIZE];
        for (shape_row, mask_row) in shape.iter_mut().zip(mask) {
            for (cell, &bit) in shape_row.iter_mut().zip(mask_row) {
                if bit != 0 {
                    *cell = CellState::Filled(self);
                }
            }
        }
        shape
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    pub fn inverse(self) -> Self {
        match self {
            Rotation::Clockwise => Rotation::CounterClockwise,
            Rotation::CounterClockwise => Rotation::Clockwise,
        }
    }

    /// Where local `(ix, iy)` lands inside the 4×4 box after rotating.
    fn map(self, ix: usize, iy: usize) -> (usize, usize) {
        let last = SHAPE_SIZE - 1;
        match self {
            Rotation::Clockwise => (last - iy, ix),
            Rotation::CounterClockwise => (iy, last - ix),
        }
    }
}

// ============================================================================
// Piece
// ============================================================================

/// A falling piece: a 4×4 shape placed with its top-left corner at `origin`.
///
/// Pieces are values. Moving or rotating yields a new piece; a rejected move
/// or rotation yields an identical copy of the original.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Piece {
    kind: PieceKind,
    shape: Shape,
    origin: Position,
}

impl Piece {
    pub fn new(kind: PieceKind, origin: Position) -> Self {
        Self {
            kind,
            shape: kind.spawn_shape(),
            origin,
        }
    }

    pub fn new_at(kind: PieceKind, x: i16, y: i16) -> Self {
        Self::new(kind, Position { x, y })
    }

    /// A fresh piece at the spawn offset for a grid `grid_width` columns wide.
    /// Widths beyond `MAX_DIMENSION` are treated as `MAX_DIMENSION`.
    pub fn spawn(kind: PieceKind, grid_width: usize) -> Self {
        let x = (grid_width.min(MAX_DIMENSION).saturating_sub(2) / 2) as i16;
        Self::new_at(kind, x, SPAWN_ROW)
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Grid coordinates of every occupied cell.
    pub fn occupied_cells(&self) -> impl Iterator<Item = Position> + '_ {
        occupied_local(&self.shape).map(move |(ix, iy)| Position {
            x: self.origin.x + ix as i16,
            y: self.origin.y + iy as i16,
        })
    }

    pub fn can_move(&self, grid: &Grid, dx: i16, dy: i16) -> bool {
        fits(grid, &self.shape, self.origin.x + dx, self.origin.y + dy)
    }

    pub fn try_move(&self, grid: &Grid, dx: i16, dy: i16) -> Piece {
        if !self.can_move(grid, dx, dy) {
            return *self;
        }
        Piece {
            origin: Position {
                x: self.origin.x + dx,
                y: self.origin.y + dy,
            },
            ..*self
        }
    }

    /// Rotates in place inside the bounding box; no kicks are attempted.
    pub fn try_rotate(&self, grid: &Grid, rotation: Rotation) -> Piece {
        let mut rotated = [[CellState::Empty; SHAPE_SIZE]; SHAPE_SIZE];
        for (ix, iy) in occupied_local(&self.shape) {
            let (rx, ry) = rotation.map(ix, iy);
            rotated[ry][rx] = self.shape[iy][ix];
        }

        if !fits(grid, &rotated, self.origin.x, self.origin.y) {
            return *self;
        }
        Piece {
            shape: rotated,
            ..*self
        }
    }

    /// The shape cell covering grid `(x, y)`, or empty outside the bounding box.
    pub fn shape_at(&self, x: i16, y: i16) -> CellState {
        let (ix, iy) = (x - self.origin.x, y - self.origin.y);
        let range = 0..SHAPE_SIZE as i16;
        if !range.contains(&ix) || !range.contains(&iy) {
            return CellState::Empty;
        }
        self.shape[iy as usize][ix as usize]
    }

    /// The same piece with its bounding box moved to row `y`.
    pub fn with_row(&self, y: i16) -> Piece {
        Piece {
            origin: Position {
                x: self.origin.x,
                y,
            },
            ..*self
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.shape {
            let line: String = row.iter().map(|cell| cell.glyph()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn occupied_local(shape: &Shape) -> impl Iterator<Item = (usize, usize)> + '_ {
    shape.iter().enumerate().flat_map(|(iy, row)| {
        row.iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_filled())
            .map(move |(ix, _)| (ix, iy))
    })
}

/// Every occupied cell of `shape`, placed at `(x, y)`, is in bounds and empty.
fn fits(grid: &Grid, shape: &Shape, x: i16, y: i16) -> bool {
    occupied_local(shape).all(|(ix, iy)| grid.is_free(x + ix as i16, y + iy as i16))
}

// ============================================================================
// Piece Provider Trait
// ============================================================================

pub trait PieceProvider: Send {
    fn next_piece(&mut self) -> PieceKind;
}

/// Uniform choice over the seven kinds.
pub struct RandomPieceProvider {
    rng: StdRng,
}

impl RandomPieceProvider {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPieceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceProvider for RandomPieceProvider {
    fn next_piece(&mut self) -> PieceKind {
        PieceKind::random(&mut self.rng)
    }
}

/// Cycles through a fixed list; an empty list cycles through every kind.
pub struct SequencePieceProvider {
    pieces: Vec<PieceKind>,
    index: usize,
}

impl SequencePieceProvider {
    pub fn new(pieces: Vec<PieceKind>) -> Self {
        let pieces = if pieces.is_empty() {
            PieceKind::ALL.to_vec()
        } else {
            pieces
        };
        Self { pieces, index: 0 }
    }
}

impl PieceProvider for SequencePieceProvider {
    fn next_piece(&mut self) -> PieceKind {
        let piece = self.pieces[self.index % self.pieces.len()];
        self.index += 1;
        piece
    }
}
