use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::{
    io::{self, stdout},
    time::{Duration, Instant},
};
use tracing::debug;

use blockfall::{
    config::{DEFAULT_HEIGHT, DEFAULT_WIDTH},
    game::SystemClock,
    piece::RandomPieceProvider,
    CellState, Command, GameConfig, GameEngine, GameState, PieceKind,
};

/// Terminal frontend for the falling-block engine.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of columns in the playfield.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Number of rows in the playfield.
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: usize,

    /// Seed for a reproducible piece sequence.
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 2;
const BLOCK_CHAR: &str = "██";
const EMPTY_CHAR: &str = "  ";

fn piece_color(kind: PieceKind) -> Color {
    match kind {
        PieceKind::I => Color::Cyan,
        PieceKind::O => Color::Yellow,
        PieceKind::T => Color::Magenta,
        PieceKind::S => Color::Green,
        PieceKind::Z => Color::Red,
        PieceKind::J => Color::Blue,
        PieceKind::L => Color::Rgb(255, 165, 0),
    }
}

fn cell_span(cell: CellState) -> Span<'static> {
    match cell {
        CellState::Empty => Span::raw(EMPTY_CHAR),
        CellState::Filled(kind) => Span::styled(BLOCK_CHAR, Style::default().fg(piece_color(kind))),
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, engine: &GameEngine) {
    let area = frame.size();
    let width = engine.grid().width() as u16;
    let height = engine.grid().height() as u16;

    let grid_display_width = (width * CELL_WIDTH) + 2;
    let grid_display_height = height + 2;
    let side_width = 16;
    let total_width = grid_display_width + side_width + 2;
    let total_height = grid_display_height + 3;

    let main_area = centered_rect(total_width, total_height, area);

    let vertical = Layout::vertical([
        Constraint::Length(grid_display_height),
        Constraint::Fill(1),
    ])
    .split(main_area);

    let game_row = vertical[0];

    let horizontal = Layout::horizontal([
        Constraint::Length(grid_display_width),
        Constraint::Length(side_width),
    ])
    .split(game_row);

    let side = Layout::vertical([Constraint::Length(6), Constraint::Fill(1)]).split(horizontal[1]);

    render_grid(frame, engine, horizontal[0]);
    render_preview(frame, engine, side[0]);
    render_info(frame, engine, side[1]);

    let controls_area = Rect {
        x: area.x,
        y: game_row.y + game_row.height,
        width: area.width,
        height: 2,
    };

    if controls_area.y + 1 < area.height {
        let controls = Paragraph::new(vec![Line::from(
            "←→/AD: Move | ↑/W Z: Rotate | ↓/S: Drop | Space: Hard drop | Q/ESC: Quit",
        )])
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(controls, controls_area);
    }
}

fn render_grid(frame: &mut Frame, engine: &GameEngine, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Blockfall ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = engine
        .render_grid()
        .into_iter()
        .map(|row| Line::from(row.into_iter().map(cell_span).collect::<Vec<_>>()))
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_preview(frame: &mut Frame, engine: &GameEngine, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Next ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if engine.is_game_over() {
        return;
    }

    // Skip blank rows so the preview sits at the top of the panel.
    let lines: Vec<Line> = engine
        .next_piece()
        .shape()
        .iter()
        .filter(|row| row.iter().any(|cell| cell.is_filled()))
        .map(|row| {
            let mut spans = vec![Span::raw(" ")];
            spans.extend(row.iter().copied().map(cell_span));
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_info(frame: &mut Frame, engine: &GameEngine, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("Score", Style::default().fg(Color::Yellow))),
        Line::from(format!("{}", engine.score())),
        Line::from(""),
        Line::from(Span::styled("Best", Style::default().fg(Color::Cyan))),
        Line::from(format!("{}", engine.best_score())),
    ];

    if let Some(status) = engine.status() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(status, Style::default().fg(Color::Red))));
        let hint = if engine.can_start_new_game() {
            "Any key: new game"
        } else {
            "Wait..."
        };
        lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));
    }

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Input
// ============================================================================

fn command_for(code: KeyCode, state: GameState) -> Option<Command> {
    if state == GameState::GameOver {
        return Some(Command::RequestNewGame);
    }
    match code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Command::MoveLeft),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Command::MoveRight),
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Command::RotateCw),
        KeyCode::Char('z') | KeyCode::Char('Z') => Some(Command::RotateCcw),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Command::SoftDrop),
        KeyCode::Char(' ') => Some(Command::HardDrop),
        _ => None,
    }
}

// ============================================================================
// Main Loop
// ============================================================================

fn main() -> io::Result<()> {
    let args = Args::parse();
    let config = GameConfig::with_size(args.width, args.height);
    let provider = match args.seed {
        Some(seed) => RandomPieceProvider::seeded(seed),
        None => RandomPieceProvider::new(),
    };
    let mut engine = GameEngine::with_provider(config, Box::new(provider), Box::new(SystemClock))
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut engine);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: &mut GameEngine,
) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, engine))?;

        let tick_delay = engine.tick_delay();
        // While the cooldown runs, wake up to redraw the restart hint.
        let timeout = if engine.is_game_over() {
            Duration::from_millis(250)
        } else {
            tick_delay
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO)
        };

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q')) {
                        break;
                    }
                    if let Some(command) = command_for(key.code, engine.state()) {
                        engine.command(command);
                        // Drops and restarts rebase the fall cadence.
                        if matches!(
                            command,
                            Command::SoftDrop | Command::HardDrop | Command::RequestNewGame
                        ) {
                            last_tick = Instant::now();
                        }
                    }
                }
            }
        }

        if !engine.is_game_over() && last_tick.elapsed() >= engine.tick_delay() {
            engine.tick();
            last_tick = Instant::now();
        }

        for event in engine.take_events() {
            debug!(?event, "game event");
        }
    }

    Ok(())
}
