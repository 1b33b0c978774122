// Fleet composition and the local, pre-submission ship layout.

use super::grid::{Coordinate, Grid, Orientation, fits, ship_cells};
use std::fmt;

/// One entry of the required fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipClass {
    pub name: String,
    pub size: usize,
}

/// Fixed multiset of ship sizes a layout must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fleet {
    classes: Vec<ShipClass>,
}

impl Fleet {
    pub fn new(classes: Vec<ShipClass>) -> Self {
        Self { classes }
    }

    /// Carrier, Battleship, Cruiser, Submarine, Destroyer.
    pub fn classic() -> Self {
        let class = |name: &str, size| ShipClass {
            name: name.to_string(),
            size,
        };
        Self::new(vec![
            class("Carrier", 5),
            class("Battleship", 4),
            class("Cruiser", 3),
            class("Submarine", 3),
            class("Destroyer", 2),
        ])
    }

    pub fn classes(&self) -> &[ShipClass] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn sorted_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.classes.iter().map(|c| c.size).collect();
        sizes.sort_unstable();
        sizes
    }
}

impl Default for Fleet {
    fn default() -> Self {
        Self::classic()
    }
}

/// A ship with its occupied cells in bow-to-stern order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedShip {
    pub name: String,
    pub size: usize,
    pub orientation: Orientation,
    pub cells: Vec<Coordinate>,
}

impl PlacedShip {
    pub fn occupies(&self, cell: Coordinate) -> bool {
        self.cells.contains(&cell)
    }
}

/// Reasons a placement or a full layout is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    InvalidSize,
    OutOfBounds,
    Overlap,
    UnknownSlot(usize),
    SlotTaken(usize),
    WrongFleet,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::InvalidSize => write!(f, "ship size must be positive"),
            PlacementError::OutOfBounds => write!(f, "ship leaves the grid"),
            PlacementError::Overlap => write!(f, "ship overlaps another ship"),
            PlacementError::UnknownSlot(slot) => write!(f, "fleet has no slot {slot}"),
            PlacementError::SlotTaken(slot) => write!(f, "fleet slot {slot} is already placed"),
            PlacementError::WrongFleet => write!(f, "layout does not match the required fleet"),
        }
    }
}

impl std::error::Error for PlacementError {}

/// Ships placed so far, one optional slot per fleet entry.
#[derive(Debug, Clone)]
pub struct ShipLayout {
    fleet: Fleet,
    grid: Grid,
    slots: Vec<Option<PlacedShip>>,
}

impl ShipLayout {
    pub fn new(fleet: Fleet, grid_size: usize) -> Self {
        let slots = vec![None; fleet.len()];
        Self {
            fleet,
            grid: Grid::new(grid_size),
            slots,
        }
    }

    /// Validates a complete set of ships against the fleet. Accepts only when
    /// the sizes match the fleet exactly, every cell is in bounds, and no two
    /// ships share a cell.
    pub fn from_ships(
        fleet: Fleet,
        grid_size: usize,
        ships: Vec<PlacedShip>,
    ) -> Result<Self, PlacementError> {
        let mut sizes: Vec<usize> = ships.iter().map(|s| s.size).collect();
        sizes.sort_unstable();
        if sizes != fleet.sorted_sizes() {
            return Err(PlacementError::WrongFleet);
        }

        let mut layout = Self::new(fleet, grid_size);
        for ship in ships {
            validate_ship_shape(&ship)?;
            if !ship.cells.iter().all(|&c| layout.grid.contains(c)) {
                return Err(PlacementError::OutOfBounds);
            }
            if ship.cells.iter().any(|&c| layout.grid.is_occupied(c)) {
                return Err(PlacementError::Overlap);
            }
            // Fill the first free slot of the same size so names need not match.
            let slot = layout
                .fleet
                .classes()
                .iter()
                .enumerate()
                .position(|(i, class)| class.size == ship.size && layout.slots[i].is_none())
                .ok_or(PlacementError::WrongFleet)?;
            layout.grid.occupy(&ship.cells);
            layout.slots[slot] = Some(ship);
        }
        Ok(layout)
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Places the ship for fleet `slot` at `origin`.
    pub fn place(
        &mut self,
        slot: usize,
        origin: Coordinate,
        orientation: Orientation,
    ) -> Result<&PlacedShip, PlacementError> {
        let class = self
            .fleet
            .classes()
            .get(slot)
            .cloned()
            .ok_or(PlacementError::UnknownSlot(slot))?;
        if self.slots[slot].is_some() {
            return Err(PlacementError::SlotTaken(slot));
        }
        if class.size == 0 {
            return Err(PlacementError::InvalidSize);
        }
        if !fits(&self.grid, origin, class.size, orientation) {
            let in_bounds = ship_cells(origin, class.size, orientation)
                .is_some_and(|cells| cells.iter().all(|&c| self.grid.contains(c)));
            return Err(if in_bounds {
                PlacementError::Overlap
            } else {
                PlacementError::OutOfBounds
            });
        }
        let cells = ship_cells(origin, class.size, orientation).ok_or(PlacementError::OutOfBounds)?;

        self.grid.occupy(&cells);
        Ok(&*self.slots[slot].insert(PlacedShip {
            name: class.name,
            size: class.size,
            orientation,
            cells,
        }))
    }

    /// Lifts the ship covering `cell` off the board and returns its slot.
    /// All of its cells are vacated so it can be placed again.
    pub fn pick_up(&mut self, cell: Coordinate) -> Option<usize> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|ship| ship.occupies(cell)))?;
        if let Some(ship) = self.slots[slot].take() {
            self.grid.vacate(&ship.cells);
        }
        Some(slot)
    }

    /// Fleet slots that still need a ship.
    pub fn remaining(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn ship_at(&self, cell: Coordinate) -> Option<&PlacedShip> {
        self.ships().find(|ship| ship.occupies(cell))
    }

    pub fn ships(&self) -> impl Iterator<Item = &PlacedShip> {
        self.slots.iter().flatten()
    }

    pub fn into_ships(self) -> Vec<PlacedShip> {
        self.slots.into_iter().flatten().collect()
    }
}

// Cells must form a straight, gap-free run matching the declared size.
fn validate_ship_shape(ship: &PlacedShip) -> Result<(), PlacementError> {
    if ship.size == 0 {
        return Err(PlacementError::InvalidSize);
    }
    let origin = *ship.cells.first().ok_or(PlacementError::InvalidSize)?;
    match ship_cells(origin, ship.size, ship.orientation) {
        Some(expected) if expected == ship.cells => Ok(()),
        _ => Err(PlacementError::OutOfBounds),
    }
}
