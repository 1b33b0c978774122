// Seat & room directory: which seat the local identity holds and who sits where.

use super::room::{Participant, RoomSnapshot, Seat};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryError {
    /// Both seats are held by other identities.
    RoomFull,
    /// The identity's remembered seat is held by someone else, or the service
    /// placed the identity on the other seat.
    SeatConflict { seat: Seat },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::RoomFull => write!(f, "room is full"),
            DirectoryError::SeatConflict { seat } => {
                write!(f, "seat {seat} is bound to a different identity")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Cached seat bindings. Once an identity has been bound to a seat it always
/// resolves to that seat again.
#[derive(Debug, Clone, Default)]
pub struct SeatDirectory {
    seats: [Option<Participant>; 2],
    bindings: HashMap<String, Seat>,
    local: Option<(String, Seat)>,
}

impl SeatDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the seat for `identity` against a fresh room snapshot and
    /// refreshes the cached bindings on success.
    pub fn resolve_seat(
        &mut self,
        identity: &str,
        room: &RoomSnapshot,
    ) -> Result<Seat, DirectoryError> {
        let remembered = self.bindings.get(identity).copied();
        let seated = room.seat_of(identity);

        let seat = match (remembered, seated) {
            (Some(held), Some(reported)) if held != reported => {
                return Err(DirectoryError::SeatConflict { seat: held });
            }
            (Some(held), _) => {
                if room
                    .occupant(held)
                    .is_some_and(|p| p.player_id != identity)
                {
                    return Err(DirectoryError::SeatConflict { seat: held });
                }
                held
            }
            (None, Some(reported)) => reported,
            (None, None) => room.free_seat().ok_or(DirectoryError::RoomFull)?,
        };

        let echoed = self.seats[seat.index()]
            .take()
            .filter(|p| p.player_id == identity);
        self.absorb(room);
        if self.seats[seat.index()].is_none() {
            // Bound locally ahead of the service echoing the occupant back.
            // The last echoed entry keeps its name; a first bind has none yet.
            self.seats[seat.index()] = Some(echoed.unwrap_or_else(|| Participant {
                player_id: identity.to_string(),
                name: String::new(),
                ready: false,
                connected: true,
                host: seat == Seat::First,
            }));
        }
        self.bindings.insert(identity.to_string(), seat);
        self.local = Some((identity.to_string(), seat));
        Ok(seat)
    }

    pub fn local_seat(&self) -> Option<Seat> {
        self.local.as_ref().map(|(_, seat)| *seat)
    }

    pub fn local_identity(&self) -> Option<&str> {
        self.local.as_ref().map(|(id, _)| id.as_str())
    }

    /// The cached occupant. The local seat may hold a placeholder with an
    /// empty name until a snapshot lists the identity.
    pub fn occupant(&self, seat: Seat) -> Option<&Participant> {
        self.seats[seat.index()].as_ref()
    }

    pub fn opponent(&self) -> Option<&Participant> {
        self.occupant(self.local_seat()?.other())
    }

    pub fn is_full(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    /// Clears a seat after its occupant was removed. The local binding is kept
    /// so a later rejoin still lands on the same seat.
    pub fn vacate(&mut self, seat: Seat) {
        if let Some(previous) = self.seats[seat.index()].take() {
            if self.local_identity() != Some(previous.player_id.as_str()) {
                self.bindings.remove(&previous.player_id);
            }
        }
    }

    fn absorb(&mut self, room: &RoomSnapshot) {
        let local = self.local_identity().map(str::to_owned);
        for seat in Seat::ALL {
            let occupant = room.occupant(seat).cloned();
            if let Some(participant) = &occupant {
                // A new occupant replaces whichever peer the seat remembered.
                self.bindings.retain(|id, bound| {
                    *bound != seat || *id == participant.player_id || Some(id) == local.as_ref()
                });
                self.bindings
                    .entry(participant.player_id.clone())
                    .or_insert(seat);
            }
            self.seats[seat.index()] = occupant;
        }
    }
}
