use std::time::Duration;

use crate::error::{GameError, Result};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_WIDTH: usize = 10;
pub const DEFAULT_HEIGHT: usize = 10;

/// Narrowest grid a spawned piece always fits in.
pub const MIN_WIDTH: usize = 5;
pub const MIN_HEIGHT: usize = 4;
/// Piece coordinates are `i16`; keep every grid index well inside that range.
pub const MAX_DIMENSION: usize = 1024;

// Timing (in milliseconds)
const BASE_DELAY_MS: u64 = 1000;
const COOLDOWN_MS: u64 = 3000;

/// Points after which the fall delay halves.
pub const SPEED_HALF_LIFE: f64 = 30.0;

// ============================================================================
// GameConfig
// ============================================================================

/// Fixed parameters of one engine instance.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    /// Delay between automatic ticks at score 0.
    pub base_delay: Duration,
    pub speed_half_life: f64,
    /// How long `GameOver` refuses a new game.
    pub cooldown: Duration,
}

impl GameConfig {
    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_WIDTH..=MAX_DIMENSION).contains(&self.width) {
            return Err(GameError::InvalidConfiguration(format!(
                "width {} must be within {}..={}",
                self.width, MIN_WIDTH, MAX_DIMENSION
            )));
        }
        if !(MIN_HEIGHT..=MAX_DIMENSION).contains(&self.height) {
            return Err(GameError::InvalidConfiguration(format!(
                "height {} must be within {}..={}",
                self.height, MIN_HEIGHT, MAX_DIMENSION
            )));
        }
        if self.base_delay.is_zero() {
            return Err(GameError::InvalidConfiguration(
                "base delay must be positive".to_string(),
            ));
        }
        if !self.speed_half_life.is_finite() || self.speed_half_life <= 0.0 {
            return Err(GameError::InvalidConfiguration(format!(
                "speed half-life {} must be a positive number of points",
                self.speed_half_life
            )));
        }
        Ok(())
    }

    /// `base_delay × 0.5^(score / speed_half_life)`, truncated to whole milliseconds.
    pub fn tick_delay(&self, score: u32) -> Duration {
        let factor = 0.5_f64.powf(f64::from(score) / self.speed_half_life);
        Duration::from_millis((self.base_delay.as_millis() as f64 * factor) as u64)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            speed_half_life: SPEED_HALF_LIFE,
            cooldown: Duration::from_millis(COOLDOWN_MS),
        }
    }
}
