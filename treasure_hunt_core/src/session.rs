//! The session loop: one agent hunting treasures against the clock.
//!
//! Each call to [`SessionController::tick`] samples the clock once and then,
//! in order of precedence:
//!
//! 1. ends the session as lost when time is up or health is gone,
//! 2. collects the current treasure if the agent stands on it, ending the
//!    session as won after the last one,
//! 3. otherwise plans a fresh path to the current treasure and takes one step.
//!
//! Ended sessions stay ended until [`SessionController::reset`] is called,
//! leaving the caller room to present the outcome first.

use std::{
    cell::Cell,
    collections::HashSet,
    ops::ControlFlow,
    rc::Rc,
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, warn};

use crate::{
    Position,
    agent::{AgentState, GoalProgress},
    config::{ConfigError, GameConfig, Rules},
    environment::{CellType, Layout, Terrain, place_treasures},
    map::GridError,
    pathfinding::{AStar, PathFinder},
};

/// Errors that abort a tick. These indicate a bug, not a game condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    #[error("grid error: {source}")]
    Grid {
        #[from]
        source: GridError,
    },
}

/// Monotonic elapsed-time source for the session countdown.
pub trait Clock {
    /// Time since the last restart.
    fn elapsed(&self) -> Duration;
    fn restart(&mut self);
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    started: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn restart(&mut self) {
        self.started = Instant::now();
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same notion of "now", so a test can keep one handle and
/// advance time for a clock owned by a [`SessionController`].
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    origin: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get().saturating_sub(self.origin)
    }

    fn restart(&mut self) {
        self.origin = self.now.get();
    }
}

/// Receives the two session outcome events.
///
/// Called from inside [`SessionController::tick`]; implementations must return
/// promptly.
pub trait AudioNotifier {
    fn on_win(&mut self);
    fn on_loss(&mut self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl AudioNotifier for SilentNotifier {
    fn on_win(&mut self) {}
    fn on_loss(&mut self) {}
}

/// External commands, sampled once per tick by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    TimeUp,
    HealthDepleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost(LossReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Ended(Outcome),
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// The agent stepped onto `to`, consuming a cell of kind `consumed`.
    Moved { to: Position, consumed: CellType },
    /// No path to `goal` exists this tick; the agent stays put.
    Stalled { goal: Position },
    /// The session ended on this tick.
    Ended(Outcome),
    /// The session had already ended; nothing happened.
    Idle,
}

/// Everything that changes during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub terrain: Terrain,
    pub agent: AgentState,
    /// Treasures in mandatory visiting order.
    pub treasures: Vec<Position>,
    pub status: SessionStatus,
}

impl SessionState {
    /// Rolls a fresh random session: agent start, then treasures, then terrain.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, config: &GameConfig) -> Self {
        let size = config.grid_size;
        let start = Position {
            x: rng.random_range(0..size),
            y: rng.random_range(0..size),
        };
        let treasures = place_treasures(rng, size, config.treasure_count, start);
        let terrain = Terrain::generate(rng, size, config.scatter_count(), start, &treasures);
        SessionState {
            terrain,
            agent: AgentState::new(start, config.rules.starting_health),
            treasures,
            status: SessionStatus::Running,
        }
    }

    pub fn from_layout(layout: &Layout, rules: &Rules) -> Self {
        SessionState {
            terrain: layout.terrain.clone(),
            agent: AgentState::new(layout.start, rules.starting_health),
            treasures: layout.treasures.clone(),
            status: SessionStatus::Running,
        }
    }
}

/// Where each new session comes from.
#[derive(Debug, Clone)]
enum SessionSource {
    Random,
    Fixed(Layout),
}

/// Read-only snapshot handed to renderers.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    pub terrain: &'a Terrain,
    pub visited: &'a HashSet<Position>,
    pub position: Position,
    pub health: u32,
    pub gold: u32,
    pub remaining_secs: u64,
    pub treasures: &'a [Position],
    pub goal_index: usize,
    pub status: SessionStatus,
    pub tick: u64,
}

/// Owns a session and advances it one tick at a time.
pub struct SessionController<P = AStar, C = MonotonicClock> {
    config: GameConfig,
    source: SessionSource,
    rng: StdRng,
    pathfinder: P,
    clock: C,
    notifier: Box<dyn AudioNotifier>,
    state: SessionState,
    /// Clock reading taken at the start of the latest tick.
    elapsed: Duration,
    tick: u64,
}

impl SessionController {
    /// A controller using A* and the wall clock.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, AStar, MonotonicClock::new())
    }
}

impl<P: PathFinder, C: Clock> SessionController<P, C> {
    pub fn with_parts(config: GameConfig, pathfinder: P, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = SessionState::generate(&mut rng, &config);
        let mut controller = SessionController {
            config,
            source: SessionSource::Random,
            rng,
            pathfinder,
            clock,
            notifier: Box::new(SilentNotifier),
            state,
            elapsed: Duration::ZERO,
            tick: 0,
        };
        controller.clock.restart();
        controller.log_session_start();
        Ok(controller)
    }

    /// Plays `layout` instead of random boards, now and after every reset.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.source = SessionSource::Fixed(layout);
        self.reset();
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn AudioNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Direct access for scripted scenarios.
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    /// Whole seconds left, as of the latest tick.
    pub fn remaining_secs(&self) -> u64 {
        self.config
            .time_limit_secs
            .saturating_sub(self.elapsed.as_secs())
    }

    pub fn view(&self) -> SessionView<'_> {
        let agent = &self.state.agent;
        SessionView {
            terrain: &self.state.terrain,
            visited: &agent.visited,
            position: agent.position,
            health: agent.health,
            gold: agent.gold,
            remaining_secs: self.remaining_secs(),
            treasures: &self.state.treasures,
            goal_index: agent.goal_index,
            status: self.state.status,
            tick: self.tick,
        }
    }

    /// Advances the session by one tick.
    pub fn tick(&mut self) -> Result<TickReport, TickError> {
        if let SessionStatus::Ended(_) = self.state.status {
            return Ok(TickReport::Idle);
        }
        self.elapsed = self.clock.elapsed();
        self.tick += 1;

        if self.elapsed >= self.config.time_limit() {
            return Ok(self.finish(Outcome::Lost(LossReason::TimeUp)));
        }
        if self.state.agent.is_depleted() {
            return Ok(self.finish(Outcome::Lost(LossReason::HealthDepleted)));
        }

        let SessionState {
            terrain,
            agent,
            treasures,
            ..
        } = &mut self.state;

        if agent.is_at_goal(treasures) {
            let collected = agent.goal_index;
            match agent.collect_goal(treasures, terrain, &self.config.rules)? {
                GoalProgress::AllCollected => return Ok(self.finish(Outcome::Won)),
                GoalProgress::Next(next) => {
                    debug!(collected, next = %next, gold = agent.gold, "Treasure collected");
                }
            }
        }

        let Some(goal) = agent.current_goal(treasures) else {
            // Only reachable with an empty treasure list.
            return Ok(self.finish(Outcome::Won));
        };

        let path = self.pathfinder.find_path(terrain, agent.position, goal);
        match path.first() {
            Some(&next) => {
                let consumed = agent.advance_one_step(next, terrain, &self.config.rules)?;
                Ok(TickReport::Moved { to: next, consumed })
            }
            None => {
                debug!(from = %agent.position, goal = %goal, "No path to treasure");
                Ok(TickReport::Stalled { goal })
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) -> TickReport {
        self.state.status = SessionStatus::Ended(outcome);
        let agent = &self.state.agent;
        info!(
            ?outcome,
            gold = agent.gold,
            health = agent.health,
            collected = agent.goal_index,
            ticks = self.tick,
            "Session ended"
        );
        match outcome {
            Outcome::Won => self.notifier.on_win(),
            Outcome::Lost(_) => self.notifier.on_loss(),
        }
        TickReport::Ended(outcome)
    }

    /// Starts a fresh session: new board, full health, no gold, restarted clock.
    pub fn reset(&mut self) {
        self.state = match &self.source {
            SessionSource::Random => SessionState::generate(&mut self.rng, &self.config),
            SessionSource::Fixed(layout) => SessionState::from_layout(layout, &self.config.rules),
        };
        self.clock.restart();
        self.elapsed = Duration::ZERO;
        self.tick = 0;
        self.log_session_start();
    }

    /// Handles an external command. `Break` means the driver should stop.
    pub fn apply_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Quit => {
                info!("Quit requested");
                ControlFlow::Break(())
            }
            Command::Restart => {
                if self.state.status == SessionStatus::Running {
                    warn!(tick = self.tick, "Restarting a running session");
                }
                self.reset();
                ControlFlow::Continue(())
            }
        }
    }

    fn log_session_start(&self) {
        info!(
            size = self.state.terrain.size(),
            start = %self.state.agent.position,
            treasures = ?self.state.treasures,
            "Session started"
        );
    }
}
