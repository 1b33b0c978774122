// Grid geometry and the stateless placement checks used while building a layout.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Default side length of a square board.
pub const GRID_SIZE: usize = 10;

/// A single cell. `x` is the row and `y` is the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: u8,
    pub y: u8,
}

impl Coordinate {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Ships lie along one of two axes. Horizontal ships extend along `y`,
/// vertical ships along `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// The other orientation, used for rotating a ship preview.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

/// Snapshot of which cells on a board are already taken by placed ships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    occupied: HashSet<Coordinate>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            occupied: HashSet::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, cell: Coordinate) -> bool {
        usize::from(cell.x) < self.size && usize::from(cell.y) < self.size
    }

    pub fn is_occupied(&self, cell: Coordinate) -> bool {
        self.occupied.contains(&cell)
    }

    pub(crate) fn occupy(&mut self, cells: &[Coordinate]) {
        self.occupied.extend(cells.iter().copied());
    }

    pub(crate) fn vacate(&mut self, cells: &[Coordinate]) {
        for cell in cells {
            self.occupied.remove(cell);
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(GRID_SIZE)
    }
}

/// Returns true when a ship of `size` starting at `origin` stays on the grid
/// and does not overlap any occupied cell.
pub fn fits(grid: &Grid, origin: Coordinate, size: usize, orientation: Orientation) -> bool {
    if size == 0 {
        return false;
    }
    match ship_cells(origin, size, orientation) {
        Some(cells) => cells
            .iter()
            .all(|&cell| grid.contains(cell) && !grid.is_occupied(cell)),
        None => false,
    }
}

/// Cells a tentative placement would cover, clipped to the grid so a preview
/// can be drawn even when the ship would overflow.
pub fn preview_cells(
    grid_size: usize,
    origin: Coordinate,
    size: usize,
    orientation: Orientation,
) -> Vec<Coordinate> {
    (0..size)
        .filter_map(|offset| step(origin, offset, orientation))
        .filter(|cell| usize::from(cell.x) < grid_size && usize::from(cell.y) < grid_size)
        .collect()
}

/// Full, unclipped cell list for a placement. `None` when a cell cannot be
/// represented at all.
pub(crate) fn ship_cells(
    origin: Coordinate,
    size: usize,
    orientation: Orientation,
) -> Option<Vec<Coordinate>> {
    (0..size)
        .map(|offset| step(origin, offset, orientation))
        .collect()
}

fn step(origin: Coordinate, offset: usize, orientation: Orientation) -> Option<Coordinate> {
    let offset = u8::try_from(offset).ok()?;
    match orientation {
        Orientation::Horizontal => Some(Coordinate::new(origin.x, origin.y.checked_add(offset)?)),
        Orientation::Vertical => Some(Coordinate::new(origin.x.checked_add(offset)?, origin.y)),
    }
}
