mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        self,
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use settings::Args;
use std::{
    fs::File,
    io::{self, Stdout, Write},
    ops::ControlFlow,
    sync::Mutex,
    time::{Duration, Instant},
};
use treasure_hunt_core::{
    Position,
    environment::{CellType, Layout as BoardLayout},
    session::{
        AudioNotifier, Command, LossReason, Outcome, SessionController, SessionStatus, SessionView,
        SilentNotifier,
    },
};

/// How long the win / game over banner stays up before the next session.
const OUTCOME_PAUSE: Duration = Duration::from_secs(3);

/// Rings the terminal bell for both outcomes.
struct BellNotifier;

impl BellNotifier {
    fn ring(&self) {
        let mut stdout = io::stdout();
        if let Err(error) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            tracing::warn!(%error, "Failed to ring terminal bell");
        }
    }
}

impl AudioNotifier for BellNotifier {
    fn on_win(&mut self) {
        self.ring();
    }

    fn on_loss(&mut self) {
        self.ring();
    }
}

struct App {
    /// The core session state machine.
    session: SessionController,
    /// Set when a session ends; the banner shows until the pause runs out.
    outcome_shown_at: Option<Instant>,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let config = args.game_config()?;
        let notifier: Box<dyn AudioNotifier> = if args.mute {
            Box::new(SilentNotifier)
        } else {
            Box::new(BellNotifier)
        };
        let mut session = SessionController::new(config)?.with_notifier(notifier);
        if let Some(path) = &args.layout {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read layout file {}", path.display()))?;
            let layout = BoardLayout::parse(&text)
                .with_context(|| format!("Failed to parse layout file {}", path.display()))?;
            session = session.with_layout(layout);
        }
        Ok(App::with_session(session))
    }

    fn with_session(session: SessionController) -> Self {
        App {
            session,
            outcome_shown_at: None,
            should_quit: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> Result<()> {
        match self.outcome_shown_at {
            Some(shown_at) if now.saturating_duration_since(shown_at) >= OUTCOME_PAUSE => {
                self.outcome_shown_at = None;
                self.session.reset();
            }
            Some(_) => {}
            None => {
                self.session.tick()?;
                if let SessionStatus::Ended(_) = self.session.status() {
                    self.outcome_shown_at = Some(now);
                }
            }
        }
        Ok(())
    }

    fn handle(&mut self, command: Command) {
        if let ControlFlow::Break(()) = self.session.apply_command(command) {
            self.should_quit = true;
        } else {
            self.outcome_shown_at = None;
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path, args.log_level())?;
    }

    // Build the session before touching the terminal so errors print cleanly
    let mut app = App::new(&args)?;

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

/// Sends log output to `path`; the terminal itself belongs to the UI.
fn init_logging(path: &std::path::Path, level: tracing::Level) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the fixed-rate main loop: draw, poll input, tick.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = app.session.config().tick_interval();
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        // At most one command per frame
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.handle(Command::Quit),
                        KeyCode::Char('r') => app.handle(Command::Restart),
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let view = app.session.view();
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Board
            Constraint::Length(3), // Stats
            Constraint::Length(2), // Help
        ])
        .split(frame.area());

    render_board(frame, main_layout[0], &view);
    render_stats(frame, main_layout[1], &view);

    let help_text = Paragraph::new("'r' restart   'q'/'Esc' quit")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);

    if let SessionStatus::Ended(outcome) = view.status {
        render_outcome(frame, main_layout[0], outcome);
    }
}

fn cell_span(view: &SessionView, position: Position, cell: CellType) -> Span<'static> {
    if position == view.position {
        return Span::styled("@ ", Style::default().fg(Color::Green).bold());
    }
    let visited = view.visited.contains(&position);
    let base = if visited {
        Style::default().bg(Color::Rgb(0, 60, 0))
    } else {
        Style::default()
    };
    match cell {
        CellType::Walkable => Span::styled(if visited { ". " } else { "  " }, base),
        CellType::Obstacle => Span::styled("# ", base.fg(Color::DarkGray)),
        CellType::GoldBonus => Span::styled("$ ", base.fg(Color::Yellow)),
        CellType::DamageHazard => Span::styled("! ", base.fg(Color::Red)),
        CellType::Treasure => {
            let order = view.treasures.iter().position(|t| *t == position);
            let label = match order {
                Some(index) if index < 9 => format!("{} ", index + 1),
                _ => "* ".to_string(),
            };
            let style = if order == Some(view.goal_index) {
                base.fg(Color::Cyan).bold().reversed()
            } else {
                base.fg(Color::Blue).bold()
            };
            Span::styled(label, style)
        }
    }
}

/// Renders the board, the agent and its trail.
fn render_board(frame: &mut Frame, area: Rect, view: &SessionView) {
    let lines: Vec<Line> = view
        .terrain
        .grid()
        .rows()
        .enumerate()
        .map(|(y, row)| {
            let spans: Vec<Span> = row
                .iter()
                .enumerate()
                .map(|(x, cell)| cell_span(view, Position { x, y }, *cell))
                .collect();
            Line::from(spans)
        })
        .collect();

    let board = Paragraph::new(lines)
        .block(Block::default().title("Treasure Hunt").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(board, area);
}

fn render_stats(frame: &mut Frame, area: Rect, view: &SessionView) {
    let health_style = if view.health <= 30 {
        Style::default().fg(Color::Red).bold()
    } else {
        Style::default()
    };
    let time_style = if view.remaining_secs <= 5 {
        Style::default().fg(Color::Red).bold()
    } else {
        Style::default()
    };
    let stats = Line::from(vec![
        Span::styled(format!("HP: {}", view.health), health_style),
        Span::raw("   "),
        Span::styled(format!("Gold: {}", view.gold), Style::default().fg(Color::Yellow)),
        Span::raw("   "),
        Span::styled(format!("Time: {}s", view.remaining_secs), time_style),
        Span::raw("   "),
        Span::raw(format!(
            "Treasure: {}/{}",
            view.goal_index.min(view.treasures.len()),
            view.treasures.len()
        )),
    ]);
    let widget = Paragraph::new(stats)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Agent"));
    frame.render_widget(widget, area);
}

fn render_outcome(frame: &mut Frame, area: Rect, outcome: Outcome) {
    let (title, detail, color) = match outcome {
        Outcome::Won => ("YOU WIN", "All treasure recovered", Color::Green),
        Outcome::Lost(LossReason::TimeUp) => ("GAME OVER", "Out of time", Color::Red),
        Outcome::Lost(LossReason::HealthDepleted) => ("GAME OVER", "Out of health", Color::Red),
    };
    let popup = centered(area, 32, 6);
    let text = vec![
        Line::from(Span::styled(title, Style::default().fg(color).bold())),
        Line::from(detail),
        Line::from(""),
        Line::from("New hunt starting shortly"),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        popup,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
