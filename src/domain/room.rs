// Room, seat, and participant snapshots as reported by the match service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One of the two fixed slots in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    pub fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Seat::First => "first",
            Seat::Second => "second",
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse stage of a match. Ordering follows the only legal direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    Placement,
    Battle,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Lobby => "lobby",
            Phase::Placement => "placement",
            Phase::Battle => "battle",
            Phase::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Timer settings chosen when the room is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomOptions {
    pub turn_duration: Duration,
    pub placement_duration: Duration,
    pub first_turn: Seat,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            turn_duration: Duration::from_secs(30),
            placement_duration: Duration::from_secs(120),
            first_turn: Seat::First,
        }
    }
}

/// An identity bound to a seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub player_id: String,
    pub name: String,
    pub ready: bool,
    pub connected: bool,
    pub host: bool,
}

/// Authoritative room state returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub id: String,
    pub phase: Phase,
    pub options: RoomOptions,
    pub seats: [Option<Participant>; 2],
    /// Epoch millis at which placement began.
    pub placement_started_at: Option<u64>,
    pub turn_owner: Option<Seat>,
    /// Epoch millis at which the current turn began.
    pub turn_started_at: Option<u64>,
    pub winner: Option<Seat>,
}

impl RoomSnapshot {
    pub fn occupant(&self, seat: Seat) -> Option<&Participant> {
        self.seats[seat.index()].as_ref()
    }

    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        Seat::ALL
            .into_iter()
            .find(|&seat| self.occupant(seat).is_some_and(|p| p.player_id == player_id))
    }

    pub fn free_seat(&self) -> Option<Seat> {
        Seat::ALL
            .into_iter()
            .find(|&seat| self.occupant(seat).is_none())
    }
}

/// Result of creating or joining a room: the room plus the caller's binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomJoined {
    pub room: RoomSnapshot,
    pub seat: Seat,
    pub player_id: String,
}

/// Partial seat update. Only `connected` is patchable from the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeatPatch {
    pub connected: Option<bool>,
}
