// Headless play policy used by the binary when no UI is attached.

use crate::domain::{
    Board, Coordinate, Fleet, Orientation, PlacedShip, PlacementError, ShipLayout, ShotOutcome,
};

/// Lays ship `i` horizontally along row `2 * i`, starting at column 0.
pub fn default_layout(fleet: &Fleet, grid_size: usize) -> Result<Vec<PlacedShip>, PlacementError> {
    let mut layout = ShipLayout::new(fleet.clone(), grid_size);
    for slot in 0..fleet.len() {
        let row = u8::try_from(slot * 2).map_err(|_| PlacementError::OutOfBounds)?;
        layout.place(slot, Coordinate::new(row, 0), Orientation::Horizontal)?;
    }
    Ok(layout.into_ships())
}

/// Picks the next cell to fire at: neighbours of confirmed hits first, then a
/// checkerboard sweep, then whatever is left.
pub fn next_target(board: &Board, grid_size: usize) -> Option<Coordinate> {
    let untargeted = |cell: &Coordinate| !board.is_targeted(*cell);

    let follow_up = board
        .marks()
        .iter()
        .filter(|m| m.confirmed && m.outcome == ShotOutcome::Hit)
        .flat_map(|m| neighbours(m.target, grid_size))
        .find(untargeted);
    if follow_up.is_some() {
        return follow_up;
    }

    let cells = || {
        (0..grid_size).flat_map(move |x| (0..grid_size).map(move |y| (x, y)))
    };
    cells()
        .filter(|(x, y)| (x + y) % 2 == 0)
        .chain(cells().filter(|(x, y)| (x + y) % 2 == 1))
        .filter_map(|(x, y)| Some(Coordinate::new(u8::try_from(x).ok()?, u8::try_from(y).ok()?)))
        .find(untargeted)
}

fn neighbours(cell: Coordinate, grid_size: usize) -> impl Iterator<Item = Coordinate> {
    let deltas: [(i16, i16); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    let limit = i16::try_from(grid_size).unwrap_or(i16::MAX);
    deltas.into_iter().filter_map(move |(dx, dy)| {
        let x = i16::from(cell.x) + dx;
        let y = i16::from(cell.y) + dy;
        if !(0..limit).contains(&x) || !(0..limit).contains(&y) {
            return None;
        }
        Some(Coordinate::new(u8::try_from(x).ok()?, u8::try_from(y).ok()?))
    })
}
