// Board projections: shots fired at the opponent and shots received.

use super::fleet::PlacedShip;
use super::grid::Coordinate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotOutcome {
    Hit,
    Miss,
}

/// A resolved shot as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shot {
    pub target: Coordinate,
    pub outcome: ShotOutcome,
}

/// A cell marked on a board. Unconfirmed marks are the local guess for the
/// player's own in-flight shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub target: Coordinate,
    pub outcome: ShotOutcome,
    pub confirmed: bool,
}

/// Result of settling a shot on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// First confirmation for the cell. Carries the optimistic guess it replaced, if any.
    Settled { guess: Option<ShotOutcome> },
    /// The cell was already confirmed; nothing changed.
    Duplicate,
}

/// Marks in submission order. A cell appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    marks: Vec<Mark>,
}

impl Board {
    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn mark_at(&self, target: Coordinate) -> Option<&Mark> {
        self.marks.iter().find(|m| m.target == target)
    }

    pub fn is_targeted(&self, target: Coordinate) -> bool {
        self.mark_at(target).is_some()
    }

    pub fn hits(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.marks
            .iter()
            .filter(|m| m.confirmed && m.outcome == ShotOutcome::Hit)
            .map(|m| m.target)
    }

    pub(crate) fn mark_optimistic(&mut self, target: Coordinate, guess: ShotOutcome) {
        if self.is_targeted(target) {
            return;
        }
        self.marks.push(Mark {
            target,
            outcome: guess,
            confirmed: false,
        });
    }

    /// Records the authoritative outcome for `target`, overwriting any guess.
    pub(crate) fn settle(&mut self, target: Coordinate, outcome: ShotOutcome) -> Settlement {
        match self.marks.iter_mut().find(|m| m.target == target) {
            Some(mark) if mark.confirmed => Settlement::Duplicate,
            Some(mark) => {
                let guess = mark.outcome;
                mark.outcome = outcome;
                mark.confirmed = true;
                Settlement::Settled { guess: Some(guess) }
            }
            None => {
                self.marks.push(Mark {
                    target,
                    outcome,
                    confirmed: true,
                });
                Settlement::Settled { guess: None }
            }
        }
    }

    /// Drops an unconfirmed mark. Confirmed marks are never removed.
    pub(crate) fn rollback(&mut self, target: Coordinate) {
        self.marks.retain(|m| m.confirmed || m.target != target);
    }
}

/// The local player's own waters: ships plus the shots received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnBoard {
    pub ships: Vec<PlacedShip>,
    pub incoming: Board,
    /// Epoch millis of the most recent shot received.
    pub last_incoming_at: Option<u64>,
}

impl OwnBoard {
    /// Ships whose every cell has been hit.
    pub fn sunk_ships(&self) -> Vec<&PlacedShip> {
        let hits: Vec<Coordinate> = self.incoming.hits().collect();
        self.ships
            .iter()
            .filter(|ship| ship.cells.iter().all(|cell| hits.contains(cell)))
            .collect()
    }
}

/// Authoritative board for one seat as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub ships: Vec<PlacedShip>,
    pub shots: Vec<Shot>,
    pub opponent_shots: Vec<Shot>,
    pub opponent_shot_at: Option<u64>,
}

/// Service response to a submitted shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotReceipt {
    pub outcome: ShotOutcome,
    /// Origin of the next turn's deadline, when the match continues.
    pub next_turn_started_at: Option<u64>,
    pub winner: Option<super::room::Seat>,
}
