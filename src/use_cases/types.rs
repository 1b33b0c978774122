// Use-case level inputs/outputs for the match state machine.

use crate::domain::{Coordinate, Phase, Seat, ShotOutcome};
use std::time::Duration;

/// Push notifications from the realtime channel, decoded at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    SeatJoined {
        room_id: String,
        seat: Seat,
        name: String,
    },
    PeerDisconnected {
        room_id: String,
        seat: Option<Seat>,
    },
    PeerReconnected {
        room_id: String,
        seat: Option<Seat>,
    },
    PlacementComplete {
        room_id: String,
        seat: Seat,
    },
    ShotFired {
        room_id: String,
        seat: Seat,
        target: Coordinate,
        outcome: ShotOutcome,
        next_turn_started_at: Option<u64>,
    },
    MatchEnded {
        room_id: String,
        winner: Seat,
    },
    SeatRemoved {
        room_id: String,
        seat: Seat,
    },
    ChatMessage {
        room_id: String,
    },
}

impl Notification {
    pub fn room_id(&self) -> &str {
        match self {
            Notification::SeatJoined { room_id, .. }
            | Notification::PeerDisconnected { room_id, .. }
            | Notification::PeerReconnected { room_id, .. }
            | Notification::PlacementComplete { room_id, .. }
            | Notification::ShotFired { room_id, .. }
            | Notification::MatchEnded { room_id, .. }
            | Notification::SeatRemoved { room_id, .. }
            | Notification::ChatMessage { room_id } => room_id,
        }
    }
}

/// UI-facing events queued by the session and drained by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    OpponentJoined {
        name: String,
    },
    PhaseChanged(Phase),
    PlacementDeadlineExpired,
    TurnDeadlineExpired {
        seat: Seat,
    },
    AuthorityMismatch {
        target: Coordinate,
        guessed: ShotOutcome,
        actual: ShotOutcome,
    },
    PeerDisconnected {
        seat: Seat,
    },
    PeerReconnected {
        seat: Seat,
    },
    MatchEnded {
        winner: Seat,
        local_won: bool,
    },
    RemovedFromRoom,
    ChatMessage,
}

/// Why the local player is no longer part of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Left,
    Removed,
}

/// Read-only projection for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub room_id: String,
    pub phase: Phase,
    pub local_seat: Option<Seat>,
    pub turn_owner: Option<Seat>,
    pub remaining: Option<Duration>,
    pub winner: Option<Seat>,
    pub can_fire: bool,
    pub opponent_connected: bool,
    pub exited: Option<ExitReason>,
}
