use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Position,
    map::{Grid, GridError},
};

/// Represents the type of a cell on the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Walkable,
    Obstacle,
    GoldBonus,
    DamageHazard,
    Treasure,
}

impl CellType {
    /// Kinds drawn with equal probability when scattering.
    pub const SCATTERED: [CellType; 3] = [
        CellType::Obstacle,
        CellType::GoldBonus,
        CellType::DamageHazard,
    ];

    pub fn is_passable(self) -> bool {
        self != CellType::Obstacle
    }
}

/// The square board the agent moves across.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    cells: Grid<CellType>,
}

impl Terrain {
    /// An all-walkable board of side `size`.
    pub fn new(size: usize) -> Self {
        Terrain {
            cells: Grid::new(size, size),
        }
    }

    /// Builds a randomised board.
    ///
    /// `scatter_count` random coordinates receive a random kind from
    /// [`CellType::SCATTERED`], skipping `start` and every treasure. Draws may
    /// land on the same coordinate twice, in which case the later one wins, so
    /// the effective density can be lower than `scatter_count`. Treasure cells
    /// are stamped last.
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        size: usize,
        scatter_count: usize,
        start: Position,
        treasures: &[Position],
    ) -> Self {
        let mut terrain = Terrain::new(size);
        for _ in 0..scatter_count {
            let position = Position {
                x: rng.random_range(0..size),
                y: rng.random_range(0..size),
            };
            let kind = CellType::SCATTERED[rng.random_range(0..CellType::SCATTERED.len())];
            if position == start || treasures.contains(&position) {
                continue;
            }
            terrain.cells[position] = kind;
        }
        for &treasure in treasures {
            if let Some(cell) = terrain.cells.get_mut(treasure) {
                *cell = CellType::Treasure;
            }
        }
        debug!(
            size,
            obstacles = terrain.count(CellType::Obstacle),
            gold = terrain.count(CellType::GoldBonus),
            hazards = terrain.count(CellType::DamageHazard),
            "Generated terrain"
        );
        terrain
    }

    /// Side length of the board.
    #[inline]
    pub fn size(&self) -> usize {
        self.cells.width()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains(position)
    }

    pub fn cell_at(&self, position: Position) -> Result<CellType, GridError> {
        self.cells.try_get(position).copied()
    }

    /// Overwrites a cell, returning what was there before.
    pub fn set(&mut self, position: Position, cell: CellType) -> Result<CellType, GridError> {
        self.cells.replace(position, cell)
    }

    /// Turns a cell walkable once its effect has been consumed.
    pub fn clear(&mut self, position: Position) -> Result<CellType, GridError> {
        self.set(position, CellType::Walkable)
    }

    /// Out-of-bounds positions are never passable.
    pub fn is_passable(&self, position: Position) -> bool {
        self.cells
            .get(position)
            .is_some_and(|cell| cell.is_passable())
    }

    pub fn count(&self, kind: CellType) -> usize {
        self.cells.as_slice().iter().filter(|cell| **cell == kind).count()
    }

    pub fn grid(&self) -> &Grid<CellType> {
        &self.cells
    }
}

/// Picks `count` distinct random positions on a `size`×`size` board, none equal to `start`.
///
/// Callers must keep `count` below `size * size`, otherwise this never returns.
pub fn place_treasures<R: Rng + ?Sized>(
    rng: &mut R,
    size: usize,
    count: usize,
    start: Position,
) -> Vec<Position> {
    let mut treasures = Vec::with_capacity(count);
    while treasures.len() < count {
        let candidate = Position {
            x: rng.random_range(0..size),
            y: rng.random_range(0..size),
        };
        if candidate != start && !treasures.contains(&candidate) {
            treasures.push(candidate);
        }
    }
    treasures
}

/// Errors from parsing a text board layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout is empty")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("layout must be square, got {width}x{height}")]
    NotSquare { width: usize, height: usize },
    #[error("unknown cell '{symbol}' at ({x}, {y})")]
    UnknownSymbol { symbol: char, x: usize, y: usize },
    #[error("no agent start ('@') found")]
    MissingStart,
    #[error("multiple agent starts ('@') found")]
    DuplicateStart,
    #[error("treasure {0} appears more than once")]
    DuplicateTreasure(u32),
    #[error("no treasures found")]
    NoTreasures,
    #[error("treasures must be numbered 1..={count} without gaps, missing {missing}")]
    TreasureGap { count: usize, missing: u32 },
}

/// A fixed board: terrain, agent start and treasures in visiting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub terrain: Terrain,
    pub start: Position,
    pub treasures: Vec<Position>,
}

impl Layout {
    /// Parses a layout, one row per line, one character per cell.
    ///
    /// ```text
    /// .  walkable      #  obstacle
    /// $  gold bonus    !  damage hazard
    /// @  agent start   1-9 treasures, in visiting order
    /// ```
    ///
    /// Whitespace between cells is ignored.
    pub fn parse(source: &str) -> Result<Self, LayoutError> {
        let rows: Vec<Vec<char>> = source
            .lines()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|row| !row.is_empty())
            .collect();
        let Some(first) = rows.first() else {
            return Err(LayoutError::Empty);
        };
        let width = first.len();
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != width {
                return Err(LayoutError::RaggedRow {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
        }
        if rows.len() != width {
            return Err(LayoutError::NotSquare {
                width,
                height: rows.len(),
            });
        }

        let mut terrain = Terrain::new(width);
        let mut start = None;
        let mut numbered = BTreeMap::new();
        for (y, cells) in rows.iter().enumerate() {
            for (x, &symbol) in cells.iter().enumerate() {
                let position = Position { x, y };
                let cell = match symbol {
                    '.' => CellType::Walkable,
                    '#' => CellType::Obstacle,
                    '$' => CellType::GoldBonus,
                    '!' => CellType::DamageHazard,
                    '@' => {
                        if start.replace(position).is_some() {
                            return Err(LayoutError::DuplicateStart);
                        }
                        CellType::Walkable
                    }
                    '1'..='9' => {
                        let order = symbol.to_digit(10).unwrap_or_default();
                        if numbered.insert(order, position).is_some() {
                            return Err(LayoutError::DuplicateTreasure(order));
                        }
                        CellType::Treasure
                    }
                    symbol => return Err(LayoutError::UnknownSymbol { symbol, x, y }),
                };
                terrain.cells[position] = cell;
            }
        }

        let start = start.ok_or(LayoutError::MissingStart)?;
        if numbered.is_empty() {
            return Err(LayoutError::NoTreasures);
        }
        let count = numbered.len();
        if let Some(missing) = (1..=count as u32).find(|order| !numbered.contains_key(order)) {
            return Err(LayoutError::TreasureGap { count, missing });
        }

        Ok(Layout {
            terrain,
            start,
            treasures: numbered.into_values().collect(),
        })
    }
}

impl std::str::FromStr for Layout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::parse(s)
    }
}
