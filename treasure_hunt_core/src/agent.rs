use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    Position,
    config::Rules,
    environment::{CellType, Terrain},
    map::GridError,
};

/// Result of collecting the current treasure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalProgress {
    /// Another treasure remains; this is the new target.
    Next(Position),
    AllCollected,
}

/// Holds the state of the treasure-hunting agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub health: u32,
    pub gold: u32,
    /// Index of the next uncollected treasure.
    pub goal_index: usize,
    /// Every cell stepped onto this session. Only used for display.
    pub visited: HashSet<Position>,
}

impl AgentState {
    pub fn new(position: Position, starting_health: u32) -> Self {
        AgentState {
            position,
            health: starting_health,
            gold: 0,
            goal_index: 0,
            visited: HashSet::new(),
        }
    }

    /// The treasure currently being hunted, or `None` once all are collected.
    pub fn current_goal(&self, treasures: &[Position]) -> Option<Position> {
        treasures.get(self.goal_index).copied()
    }

    pub fn is_depleted(&self) -> bool {
        self.health == 0
    }

    /// Applies the stat change of landing on `cell`. Health never drops below
    /// zero and gold stops at `u32::MAX`.
    pub fn apply_arrival_effect(&mut self, cell: CellType, rules: &Rules) {
        match cell {
            CellType::GoldBonus => self.gold = self.gold.saturating_add(rules.gold_bonus),
            CellType::DamageHazard => self.health = self.health.saturating_sub(rules.damage),
            CellType::Walkable | CellType::Obstacle | CellType::Treasure => {}
        }
    }

    /// Moves onto `next`, consuming whatever the cell held.
    ///
    /// The effect sees the cell as it was before clearing. Returns that cell type.
    pub fn advance_one_step(
        &mut self,
        next: Position,
        terrain: &mut Terrain,
        rules: &Rules,
    ) -> Result<CellType, GridError> {
        let cell = terrain.cell_at(next)?;
        self.position = next;
        self.visited.insert(next);
        self.apply_arrival_effect(cell, rules);
        terrain.clear(next)?;
        trace!(position = %next, ?cell, health = self.health, gold = self.gold, "Agent stepped");
        Ok(cell)
    }

    /// True when standing on the current treasure.
    pub fn is_at_goal(&self, treasures: &[Position]) -> bool {
        self.current_goal(treasures) == Some(self.position)
    }

    /// Claims the current treasure: awards the bonus, clears the cell and moves
    /// on to the next target.
    ///
    /// Only meaningful after [`AgentState::is_at_goal`] returned true.
    pub fn collect_goal(
        &mut self,
        treasures: &[Position],
        terrain: &mut Terrain,
        rules: &Rules,
    ) -> Result<GoalProgress, GridError> {
        terrain.clear(self.position)?;
        self.gold = self.gold.saturating_add(rules.treasure_bonus);
        self.goal_index += 1;
        Ok(match self.current_goal(treasures) {
            Some(next) => GoalProgress::Next(next),
            None => GoalProgress::AllCollected,
        })
    }
}
