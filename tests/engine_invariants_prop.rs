//! Property tests over random command sequences.
//!
//! Invariants covered:
//! - Every occupied cell of the active piece is on the grid and over an empty cell.
//! - The next piece's occupied cells lie inside the grid.
//! - Only a piece that has not yet fallen may have its box above row 0.
//! - Score never decreases within a game; best score never decreases at all.
//! - `best_score` equals the max of the previous best and the final score at game over.
//! - Every rejected move or rotation leaves the active piece unchanged.

use proptest::prelude::*;

use blockfall::game::test_helpers::ManualClock;
use blockfall::piece::RandomPieceProvider;
use blockfall::{Command, GameConfig, GameEngine, GameState, StepOutcome};

const COMMANDS: [Command; 7] = [
    Command::MoveLeft,
    Command::MoveRight,
    Command::RotateCw,
    Command::RotateCcw,
    Command::SoftDrop,
    Command::HardDrop,
    Command::RequestNewGame,
];

fn seeded_engine(seed: u64, width: usize, height: usize) -> (GameEngine, ManualClock) {
    let clock = ManualClock::new();
    let engine = GameEngine::with_provider(
        GameConfig::with_size(width, height),
        Box::new(RandomPieceProvider::seeded(seed)),
        Box::new(clock.clone()),
    )
    .unwrap();
    (engine, clock)
}

fn assert_active_piece_placed(engine: &GameEngine) -> Result<(), TestCaseError> {
    let width = engine.grid().width() as i16;
    let height = engine.grid().height() as i16;
    for block in engine.next_piece().occupied_cells() {
        prop_assert!(
            (0..width).contains(&block.x) && (0..height).contains(&block.y),
            "next piece cell ({}, {}) is off-grid",
            block.x,
            block.y
        );
    }

    let Some(piece) = engine.active_piece() else {
        prop_assert_eq!(engine.state(), GameState::GameOver);
        return Ok(());
    };
    prop_assert!(piece.origin().y >= -1);
    for block in piece.occupied_cells() {
        prop_assert!(
            engine.grid().is_free(block.x, block.y),
            "active cell ({}, {}) is off-grid or overlaps",
            block.x,
            block.y
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn random_play_respects_core_invariants(
        seed in any::<u64>(),
        width in 5usize..14,
        height in 4usize..22,
        picks in prop::collection::vec(0usize..COMMANDS.len() + 1, 1..300),
    ) {
        let (mut engine, clock) = seeded_engine(seed, width, height);
        assert_active_piece_placed(&engine)?;

        for pick in picks {
            let before_piece = engine.active_piece().copied();
            let before_score = engine.score();
            let before_best = engine.best_score();
            let was_over = engine.is_game_over();

            let changed = match COMMANDS.get(pick) {
                Some(&command) => engine.command(command),
                None => engine.tick() != StepOutcome::Idle,
            };

            if !changed {
                prop_assert_eq!(engine.active_piece().copied(), before_piece);
                prop_assert_eq!(engine.score(), before_score);
            }
            assert_active_piece_placed(&engine)?;
            prop_assert!(engine.best_score() >= before_best);

            let restarted = was_over && !engine.is_game_over();
            if restarted {
                prop_assert_eq!(engine.score(), 0);
                prop_assert!(engine.grid().is_empty());
            } else {
                prop_assert!(engine.score() >= before_score);
            }

            if !was_over && engine.is_game_over() {
                prop_assert_eq!(engine.best_score(), before_best.max(engine.score()));
                clock.advance(engine.config().cooldown);
            }
        }
    }

    #[test]
    fn hard_drop_always_advances_to_a_new_piece(
        seed in any::<u64>(),
        drops in 1usize..60,
    ) {
        let (mut engine, _clock) = seeded_engine(seed, 10, 10);

        for _ in 0..drops {
            if engine.is_game_over() {
                break;
            }
            let before = engine.grid().filled_count();
            prop_assert!(engine.hard_drop());
            // A lock either added cells or cleared rows (or ended the game).
            prop_assert!(
                engine.grid().filled_count() != before
                    || engine.is_game_over()
                    || engine.score() > 0
            );
            if let Some(piece) = engine.active_piece() {
                prop_assert_eq!(piece.origin().y, 0);
            }
        }
    }
}
