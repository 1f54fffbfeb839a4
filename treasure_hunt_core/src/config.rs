//! Tunable parameters for a treasure hunt session.
//!
//! Every field has a default matching the classic game: a 20×20 board, three
//! treasures, 9×N scattered cells and a 30 second budget.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("grid size must be at least 2, got {0}")]
    GridTooSmall(usize),
    #[error("grid size {0} is too large")]
    GridTooLarge(usize),
    #[error("treasure count must be between 1 and {max}, got {count}")]
    TreasureCount { count: usize, max: usize },
    #[error("ticks per second must be at least 1")]
    ZeroTickRate,
}

/// Stat changes applied when the agent lands on a cell or reaches a treasure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub starting_health: u32,
    /// Gold granted by a `GoldBonus` cell.
    pub gold_bonus: u32,
    /// Health removed by a `DamageHazard` cell.
    pub damage: u32,
    /// Gold granted for reaching the current treasure.
    pub treasure_bonus: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            starting_health: 100,
            gold_bonus: 10,
            damage: 10,
            treasure_bonus: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Side length N of the square board.
    pub grid_size: usize,
    pub treasure_count: usize,
    /// Scatter attempts per board side; the total is `scatter_per_side * grid_size`.
    pub scatter_per_side: usize,
    pub time_limit_secs: u64,
    pub ticks_per_second: u32,
    /// Fixed RNG seed. `None` seeds from the operating system.
    pub seed: Option<u64>,
    pub rules: Rules,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            grid_size: 20,
            treasure_count: 3,
            scatter_per_side: 9,
            time_limit_secs: 30,
            ticks_per_second: 60,
            seed: None,
            rules: Rules::default(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < 2 {
            return Err(ConfigError::GridTooSmall(self.grid_size));
        }
        // One cell is always reserved for the agent start.
        let max = self
            .grid_size
            .checked_mul(self.grid_size)
            .ok_or(ConfigError::GridTooLarge(self.grid_size))?
            - 1;
        if self.treasure_count == 0 || self.treasure_count > max {
            return Err(ConfigError::TreasureCount {
                count: self.treasure_count,
                max,
            });
        }
        if self.ticks_per_second == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        Ok(())
    }

    pub fn scatter_count(&self) -> usize {
        self.scatter_per_side * self.grid_size
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    /// Target duration of a single tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.ticks_per_second.max(1)
    }
}
