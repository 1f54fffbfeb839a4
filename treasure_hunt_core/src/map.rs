use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Errors raised by bounds-checked grid access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position ({x}, {y}) is out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// A 2D grid of cells stored row-major in a flat vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid filled with `T::default()`.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    /// Creates a grid whose cells are produced by `f(position)`, visited row by row.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(Position { x, y }));
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index_of(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            Some(position.y * self.width + position.x)
        } else {
            None
        }
    }

    /// Checks whether `position` lies inside the grid.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    fn out_of_bounds(&self, position: Position) -> GridError {
        GridError::OutOfBounds {
            x: position.x,
            y: position.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Returns the cell at `position`, or `None` when out of bounds.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.index_of(position).map(|index| &self.cells[index])
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        self.index_of(position).map(move |index| &mut self.cells[index])
    }

    /// Like [`Grid::get`], but reports the failing coordinates.
    pub fn try_get(&self, position: Position) -> Result<&T, GridError> {
        self.get(position).ok_or_else(|| self.out_of_bounds(position))
    }

    /// Replaces the cell at `position`, returning the previous value.
    pub fn replace(&mut self, position: Position, value: T) -> Result<T, GridError> {
        let index = self
            .index_of(position)
            .ok_or_else(|| self.out_of_bounds(position))?;
        Ok(std::mem::replace(&mut self.cells[index], value))
    }

    /// Iterates the grid one row at a time, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // `chunks` panics on zero, and an empty grid has no rows anyway.
        self.cells.chunks(self.width.max(1))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.index_of(position) {
            Some(index) => &self.cells[index],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        match self.index_of(position) {
            Some(index) => &mut self.cells[index],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, self.width, self.height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_visits_row_major() {
        let grid = Grid::from_generator(3, 2, |p| p.y * 10 + p.x);
        assert_eq!(grid.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(grid[Position::new(2, 1)], 12);
    }

    #[test]
    fn out_of_bounds_access_is_reported() {
        let mut grid: Grid<u8> = Grid::new(4, 4);
        assert!(grid.get(Position::new(4, 0)).is_none());
        assert_eq!(
            grid.replace(Position::new(1, 7), 3),
            Err(GridError::OutOfBounds {
                x: 1,
                y: 7,
                width: 4,
                height: 4
            })
        );
        assert!(grid.try_get(Position::new(0, 4)).is_err());
    }

    #[test]
    fn replace_returns_previous_value() {
        let mut grid: Grid<u8> = Grid::new(2, 2);
        let at = Position::new(1, 1);
        assert_eq!(grid.replace(at, 9), Ok(0));
        assert_eq!(grid.replace(at, 4), Ok(9));
        assert_eq!(grid[at], 4);
    }

    #[test]
    fn rows_run_top_to_bottom() {
        let grid = Grid::from_generator(2, 3, |p| (p.x, p.y));
        let rows: Vec<_> = grid.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], &[(0, 2), (1, 2)]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn indexing_outside_panics() {
        let grid: Grid<u8> = Grid::new(2, 2);
        let _ = grid[Position::new(2, 2)];
    }
}
