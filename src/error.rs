use thiserror::Error;

/// Everything that can go wrong inside the engine.
///
/// Commands issued in the wrong state are not errors; they are no-ops.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i16,
        y: i16,
        width: usize,
        height: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("cell value {0} is not a valid colour id (expected 0..=7)")]
    InvalidCellValue(u8),
}

pub type Result<T> = std::result::Result<T, GameError>;
