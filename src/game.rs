use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::grid::{CellState, Grid};
use crate::piece::{Piece, PieceProvider, RandomPieceProvider, Rotation};

pub const STATUS_HIGH_SCORE: &str = "HIGH SCORE :)";
pub const STATUS_GAME_OVER: &str = "GAME OVER :(";

/// Pending events kept for a host that does not drain them; the oldest go first.
pub const MAX_PENDING_EVENTS: usize = 256;

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameState {
    /// Transient: a fresh game is drawing its first pieces.
    Spawning,
    Falling,
    GameOver,
}

/// The closed set of inputs accepted from the input collaborator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    RequestNewGame,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GameEvent {
    GameStarted,
    PieceMoved,
    PieceRotated,
    PieceLocked,
    RowsCleared(u32),
    GameOver { high_score: bool },
}

/// What a single fall-or-lock step did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepOutcome {
    /// The active piece dropped one row.
    Fell,
    /// The active piece locked; the next piece took over or the game ended.
    Locked,
    /// Nothing is falling.
    Idle,
}

/// Points awarded for clearing `rows` rows with a single lock.
pub fn points_for_rows(rows: u32) -> u32 {
    rows * rows
}

// ============================================================================
// Clock
// ============================================================================

/// Time source for the game-over cooldown.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ============================================================================
// GameEngine
// ============================================================================

/// Owns the grid, the falling and queued pieces, the scores and the state machine.
///
/// Every method runs to completion before returning; callers delivering input
/// from several threads must serialize access themselves.
pub struct GameEngine {
    config: GameConfig,
    grid: Grid,
    active_piece: Option<Piece>,
    next_piece: Piece,
    score: u32,
    best_score: u32,
    state: GameState,
    cooldown_deadline: Option<Instant>,
    status: Option<&'static str>,
    piece_provider: Box<dyn PieceProvider>,
    clock: Box<dyn Clock>,
    events: VecDeque<GameEvent>,
}

impl GameEngine {
    pub fn new(config: GameConfig) -> Result<Self> {
        Self::with_provider(
            config,
            Box::new(RandomPieceProvider::new()),
            Box::new(SystemClock),
        )
    }

    pub fn with_provider(
        config: GameConfig,
        mut provider: Box<dyn PieceProvider>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let grid = Grid::new(config.width, config.height)?;
        let active_piece = Piece::spawn(provider.next_piece(), config.width);
        let next_piece = Piece::spawn(provider.next_piece(), config.width);

        let mut engine = Self {
            config,
            grid,
            active_piece: Some(active_piece),
            next_piece,
            score: 0,
            best_score: 0,
            state: GameState::Spawning,
            cooldown_deadline: None,
            status: None,
            piece_provider: provider,
            clock,
            events: VecDeque::new(),
        };
        engine.begin_falling();
        Ok(engine)
    }

    /// Replaces the grid and the active piece, e.g. to set up a position.
    pub fn with_grid(mut self, grid: Grid, active_piece: Piece) -> Result<Self> {
        if grid.width() != self.config.width || grid.height() != self.config.height {
            return Err(GameError::InvalidConfiguration(format!(
                "grid is {}x{} but the engine is configured for {}x{}",
                grid.width(),
                grid.height(),
                self.config.width,
                self.config.height
            )));
        }
        self.grid = grid;
        self.active_piece = Some(active_piece);
        self.state = GameState::Falling;
        self.cooldown_deadline = None;
        self.status = None;
        Ok(self)
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn active_piece(&self) -> Option<&Piece> {
        self.active_piece.as_ref()
    }

    pub fn next_piece(&self) -> &Piece {
        &self.next_piece
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn status(&self) -> Option<&'static str> {
        self.status
    }

    pub fn is_game_over(&self) -> bool {
        self.state == GameState::GameOver
    }

    /// Delay the clock collaborator should wait before the next `tick`.
    pub fn tick_delay(&self) -> Duration {
        self.config.tick_delay(self.score)
    }

    /// Time left before `new_game` is accepted; zero outside the cooldown.
    pub fn cooldown_remaining(&self) -> Duration {
        match (self.state, self.cooldown_deadline) {
            (GameState::GameOver, Some(deadline)) => {
                deadline.saturating_duration_since(self.clock.now())
            }
            _ => Duration::ZERO,
        }
    }

    pub fn can_start_new_game(&self) -> bool {
        self.cooldown_remaining().is_zero()
    }

    /// The grid cell at `(x, y)`, or the active piece's cell when the grid is empty there.
    pub fn cell_at(&self, x: i16, y: i16) -> Result<CellState> {
        let cell = self.grid.get(x, y)?;
        if cell.is_filled() {
            return Ok(cell);
        }
        Ok(self
            .active_piece
            .map_or(CellState::Empty, |piece| piece.shape_at(x, y)))
    }

    /// The grid with the active piece composited over its empty cells.
    pub fn render_grid(&self) -> Vec<Vec<CellState>> {
        let mut visual_grid = self.grid.rows().to_vec();
        if let Some(piece) = &self.active_piece {
            for block in piece.occupied_cells() {
                let (Ok(col), Ok(row)) = (usize::try_from(block.x), usize::try_from(block.y))
                else {
                    continue;
                };
                if let Some(cell) = visual_grid.get_mut(row).and_then(|r| r.get_mut(col)) {
                    if cell.is_empty() {
                        *cell = piece.shape_at(block.x, block.y);
                    }
                }
            }
        }
        visual_grid
    }

    /// Takes and clears all pending events, oldest first
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events).into()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Starts a fresh game. Refused (returning `false`) while the game-over
    /// cooldown is still running.
    pub fn new_game(&mut self) -> bool {
        if !self.can_start_new_game() {
            debug!(
                remaining_ms = self.cooldown_remaining().as_millis() as u64,
                "new game refused during cooldown"
            );
            return false;
        }

        self.state = GameState::Spawning;
        self.grid.reset();
        self.score = 0;
        self.status = None;
        self.cooldown_deadline = None;
        self.active_piece = Some(self.draw_piece());
        self.next_piece = self.draw_piece();
        self.begin_falling();
        true
    }

    /// Dispatches one input command. Returns whether anything changed; commands
    /// that do not apply in the current state are no-ops.
    pub fn command(&mut self, command: Command) -> bool {
        match command {
            Command::MoveLeft => self.move_left(),
            Command::MoveRight => self.move_right(),
            Command::RotateCw => self.rotate(Rotation::Clockwise),
            Command::RotateCcw => self.rotate(Rotation::CounterClockwise),
            Command::SoftDrop => self.soft_drop(),
            Command::HardDrop => self.hard_drop(),
            Command::RequestNewGame => self.is_game_over() && self.new_game(),
        }
    }

    pub fn tick(&mut self) -> StepOutcome {
        if self.state != GameState::Falling {
            return StepOutcome::Idle;
        }
        self.step()
    }

    pub fn move_left(&mut self) -> bool {
        self.shift(-1)
    }

    pub fn move_right(&mut self) -> bool {
        self.shift(1)
    }

    pub fn rotate(&mut self, rotation: Rotation) -> bool {
        self.replace_active(
            |piece, grid| piece.try_rotate(grid, rotation),
            GameEvent::PieceRotated,
        )
    }

    pub fn soft_drop(&mut self) -> bool {
        self.tick() != StepOutcome::Idle
    }

    /// Falls until the active piece locks. Each iteration either drops one row
    /// or locks, so the loop is bounded by the grid height.
    pub fn hard_drop(&mut self) -> bool {
        if self.state != GameState::Falling {
            return false;
        }
        while self.step() == StepOutcome::Fell {}
        true
    }

    fn shift(&mut self, dx: i16) -> bool {
        self.replace_active(|piece, grid| piece.try_move(grid, dx, 0), GameEvent::PieceMoved)
    }

    fn replace_active(
        &mut self,
        update: impl Fn(&Piece, &Grid) -> Piece,
        event: GameEvent,
    ) -> bool {
        if self.state != GameState::Falling {
            return false;
        }
        let Some(piece) = self.active_piece else {
            return false;
        };
        let updated = update(&piece, &self.grid);
        if updated == piece {
            return false;
        }
        self.active_piece = Some(updated);
        self.push_event(event);
        true
    }

    fn step(&mut self) -> StepOutcome {
        let Some(piece) = self.active_piece else {
            return StepOutcome::Idle;
        };
        if piece.can_move(&self.grid, 0, 1) {
            self.active_piece = Some(piece.try_move(&self.grid, 0, 1));
            return StepOutcome::Fell;
        }

        self.lock(piece);
        let rows = self.grid.clear_full_rows();
        if rows > 0 {
            self.score = self.score.saturating_add(points_for_rows(rows));
            self.push_event(GameEvent::RowsCleared(rows));
            debug!(rows, score = self.score, "rows cleared");
        }

        if self.next_piece.can_move(&self.grid, 0, 1) {
            self.active_piece = Some(self.next_piece.with_row(0));
            self.next_piece = self.draw_piece();
        } else {
            self.end_game();
        }
        StepOutcome::Locked
    }

    /// Writes the piece into the grid, never overwriting an occupied cell.
    fn lock(&mut self, piece: Piece) {
        for block in piece.occupied_cells() {
            self.grid
                .fill_if_empty(block.x, block.y, piece.shape_at(block.x, block.y));
        }
        self.push_event(GameEvent::PieceLocked);
        debug!(kind = ?piece.kind(), x = piece.origin().x, y = piece.origin().y, "piece locked");
    }

    fn end_game(&mut self) {
        // Show the blocked piece where it would have entered.
        let blocked = self.next_piece;
        for block in blocked.occupied_cells() {
            self.grid
                .fill_if_empty(block.x, block.y, blocked.shape_at(block.x, block.y));
        }

        let high_score = self.score > self.best_score;
        self.best_score = self.best_score.max(self.score);
        self.status = Some(if high_score {
            STATUS_HIGH_SCORE
        } else {
            STATUS_GAME_OVER
        });
        self.active_piece = None;
        self.state = GameState::GameOver;
        self.cooldown_deadline = Some(self.clock.now() + self.config.cooldown);
        self.push_event(GameEvent::GameOver { high_score });
        info!(score = self.score, best = self.best_score, high_score, "game over");
    }

    fn begin_falling(&mut self) {
        self.state = GameState::Falling;
        self.push_event(GameEvent::GameStarted);
        info!(
            width = self.config.width,
            height = self.config.height,
            best = self.best_score,
            "game started"
        );
    }

    fn push_event(&mut self, event: GameEvent) {
        if self.events.len() == MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn draw_piece(&mut self) -> Piece {
        Piece::spawn(self.piece_provider.next_piece(), self.config.width)
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::piece::{PieceKind, SequencePieceProvider};

    /// A clock that only moves when told to. Clones share the same time.
    #[derive(Clone)]
    pub struct ManualClock {
        start: Instant,
        elapsed_ms: Arc<AtomicU64>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                start: Instant::now(),
                elapsed_ms: Arc::new(AtomicU64::new(0)),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.elapsed_ms
                .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
        }
    }

    /// Default-sized engine fed from a fixed piece sequence, plus its clock.
    pub fn sequence_engine(pieces: Vec<PieceKind>) -> Result<(GameEngine, ManualClock)> {
        let clock = ManualClock::new();
        let engine = GameEngine::with_provider(
            GameConfig::default(),
            Box::new(SequencePieceProvider::new(pieces)),
            Box::new(clock.clone()),
        )?;
        Ok((engine, clock))
    }

    pub fn empty_grid() -> Grid {
        Grid::default()
    }

    pub fn fill_row(grid: &mut Grid, y: i16) -> Result<()> {
        for x in 0..grid.width() as i16 {
            grid.set_cell(x, y, CellState::Filled(PieceKind::T))?;
        }
        Ok(())
    }

    pub fn fill_row_with_gap(grid: &mut Grid, y: i16, gap_x: i16) -> Result<()> {
        for x in 0..grid.width() as i16 {
            if x != gap_x {
                grid.set_cell(x, y, CellState::Filled(PieceKind::T))?;
            }
        }
        Ok(())
    }
}
