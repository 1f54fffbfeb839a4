use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque},
};

use crate::{Position, environment::Terrain};

/// Produces the sequence of cells leading from `start` to `goal`.
///
/// Implementations return the cells to step onto in order, excluding `start`
/// and ending on `goal`. An empty vector means there is nothing to walk: the
/// goal is unreachable or already reached.
pub trait PathFinder {
    fn find_path(&self, terrain: &Terrain, start: Position, goal: Position) -> Vec<Position>;
}

/// Returns manhattan distance between two positions
pub fn manhattan_distance(a: Position, b: Position) -> usize {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// A* search over four-connected passable cells with unit step cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStar;

// For priority queue
#[derive(Clone, Copy, Eq, PartialEq)]
struct Frontier {
    priority: usize,
    cost: usize,
    position: Position,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other.priority.cmp(&self.priority)
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PathFinder for AStar {
    fn find_path(&self, terrain: &Terrain, start: Position, goal: Position) -> Vec<Position> {
        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut cost_so_far: HashMap<Position, usize> = HashMap::new();

        frontier.push(Frontier {
            priority: manhattan_distance(start, goal),
            cost: 0,
            position: start,
        });
        cost_so_far.insert(start, 0);

        while let Some(Frontier {
            cost,
            position: current,
            ..
        }) = frontier.pop()
        {
            if current == goal {
                return reconstruct(&came_from, start, goal);
            }
            // A cheaper route to `current` was queued after this entry.
            if cost_so_far.get(&current).is_some_and(|best| cost > *best) {
                continue;
            }

            for neighbor in current.orthogonal_neighbors() {
                if !terrain.is_passable(neighbor) {
                    continue;
                }
                let new_cost = cost + 1;
                if cost_so_far
                    .get(&neighbor)
                    .is_none_or(|known| new_cost < *known)
                {
                    cost_so_far.insert(neighbor, new_cost);
                    came_from.insert(neighbor, current);
                    frontier.push(Frontier {
                        priority: new_cost + manhattan_distance(neighbor, goal),
                        cost: new_cost,
                        position: neighbor,
                    });
                }
            }
        }

        Vec::new()
    }
}

/// Walks `came_from` back from `goal`, yielding the path in travel order without `start`.
fn reconstruct(
    came_from: &HashMap<Position, Position>,
    start: Position,
    goal: Position,
) -> Vec<Position> {
    let mut path = Vec::new();
    let mut current = goal;
    while current != start {
        path.push(current);
        match came_from.get(&current) {
            Some(previous) => current = *previous,
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

/// Breadth-first step count from `start` to `goal`, or `None` if unreachable.
///
/// Slower than [`AStar`] but trivially optimal; useful for checking other searches.
pub fn shortest_distance(terrain: &Terrain, start: Position, goal: Position) -> Option<usize> {
    if !terrain.contains(start) {
        return None;
    }
    let mut distances = HashMap::from([(start, 0usize)]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        let distance = distances[&current];
        if current == goal {
            return Some(distance);
        }
        for neighbor in current.orthogonal_neighbors() {
            if terrain.is_passable(neighbor) && !distances.contains_key(&neighbor) {
                distances.insert(neighbor, distance + 1);
                queue.push_back(neighbor);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{CellType, Layout};

    fn p(x: usize, y: usize) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn straight_line_on_open_board() {
        let terrain = Terrain::new(5);
        let path = AStar.find_path(&terrain, p(0, 0), p(2, 0));
        assert_eq!(path, vec![p(1, 0), p(2, 0)]);
    }

    #[test]
    fn start_equal_to_goal_yields_nothing() {
        let terrain = Terrain::new(5);
        assert!(AStar.find_path(&terrain, p(3, 3), p(3, 3)).is_empty());
    }

    #[test]
    fn routes_around_a_wall() {
        let layout = Layout::parse(
            "
            @ # 1
            . # .
            . . .
            ",
        )
        .unwrap();
        let path = AStar.find_path(&layout.terrain, layout.start, layout.treasures[0]);
        assert_eq!(path, vec![p(0, 1), p(0, 2), p(1, 2), p(2, 2), p(2, 1), p(2, 0)]);
    }

    #[test]
    fn enclosed_goal_is_unreachable() {
        let layout = Layout::parse(
            "
            @ . . . .
            . . # . .
            . # 1 # .
            . . # . .
            . . . . .
            ",
        )
        .unwrap();
        let goal = layout.treasures[0];
        assert!(AStar.find_path(&layout.terrain, layout.start, goal).is_empty());
        assert_eq!(shortest_distance(&layout.terrain, layout.start, goal), None);
    }

    #[test]
    fn hazards_and_gold_do_not_block() {
        let mut terrain = Terrain::new(3);
        terrain.set(p(1, 0), CellType::DamageHazard).unwrap();
        terrain.set(p(2, 0), CellType::GoldBonus).unwrap();
        terrain.set(p(0, 1), CellType::Obstacle).unwrap();
        terrain.set(p(1, 1), CellType::Obstacle).unwrap();
        let path = AStar.find_path(&terrain, p(0, 0), p(2, 1));
        assert_eq!(path, vec![p(1, 0), p(2, 0), p(2, 1)]);
    }

    #[test]
    fn out_of_bounds_goal_is_unreachable() {
        let terrain = Terrain::new(4);
        assert!(AStar.find_path(&terrain, p(0, 0), p(9, 9)).is_empty());
    }

    #[test]
    fn manhattan_is_symmetric() {
        assert_eq!(manhattan_distance(p(1, 5), p(4, 1)), 7);
        assert_eq!(manhattan_distance(p(4, 1), p(1, 5)), 7);
        assert_eq!(manhattan_distance(p(2, 2), p(2, 2)), 0);
    }
}
