// Error taxonomy for the match client.

use super::directory::DirectoryError;
use super::fleet::PlacementError;
use super::grid::Coordinate;
use super::room::{Phase, Seat};
use std::fmt;

/// Failure reported by a Service Boundary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service could not be reached or timed out.
    Transport(String),
    /// The service answered with a non-success status.
    Upstream { status: u16, message: Option<String> },
    /// The response body did not match the expected shape.
    Decode(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Transport(err) => write!(f, "match service transport error: {err}"),
            ServiceError::Upstream { status, message } => {
                if let Some(message) = message {
                    write!(f, "match service error {status}: {message}")
                } else {
                    write!(f, "match service error {status}")
                }
            }
            ServiceError::Decode(err) => write!(f, "match service response decode error: {err}"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Actions rejected locally, before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IllegalAction {
    WrongPhase { expected: Phase, actual: Phase },
    NotYourTurn,
    AlreadyTargeted(Coordinate),
    OutOfBounds(Coordinate),
    LayoutAlreadySubmitted,
    InvalidLayout(PlacementError),
    /// Another own action is still awaiting confirmation.
    ActionPending,
    MatchEnded,
    NotHost,
    OpponentMissing,
    SeatUnresolved,
    LeftMatch,
}

impl fmt::Display for IllegalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalAction::WrongPhase { expected, actual } => {
                write!(f, "action requires phase {expected}, match is in {actual}")
            }
            IllegalAction::NotYourTurn => write!(f, "it is not your turn"),
            IllegalAction::AlreadyTargeted(target) => write!(f, "{target} was already fired at"),
            IllegalAction::OutOfBounds(target) => write!(f, "{target} is outside the grid"),
            IllegalAction::LayoutAlreadySubmitted => write!(f, "layout was already submitted"),
            IllegalAction::InvalidLayout(err) => write!(f, "invalid layout: {err}"),
            IllegalAction::ActionPending => write!(f, "previous action is still pending"),
            IllegalAction::MatchEnded => write!(f, "match has ended"),
            IllegalAction::NotHost => write!(f, "only the host may do that"),
            IllegalAction::OpponentMissing => write!(f, "no opponent is seated"),
            IllegalAction::SeatUnresolved => write!(f, "local seat is not resolved"),
            IllegalAction::LeftMatch => write!(f, "local player is no longer in the match"),
        }
    }
}

/// Errors surfaced by the match state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// A service call failed; local state is unchanged and the call may be retried.
    NetworkFailure(ServiceError),
    /// A notification or snapshot referenced a different match.
    StaleNotification { room_id: String },
    IllegalAction(IllegalAction),
    RoomFull,
    SeatConflict { seat: Seat },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::NetworkFailure(err) => write!(f, "network failure: {err}"),
            MatchError::StaleNotification { room_id } => {
                write!(f, "notification for unknown room {room_id}")
            }
            MatchError::IllegalAction(action) => write!(f, "illegal action: {action}"),
            MatchError::RoomFull => write!(f, "room is full"),
            MatchError::SeatConflict { seat } => {
                write!(f, "seat {seat} is bound to a different identity")
            }
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::NetworkFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ServiceError> for MatchError {
    fn from(err: ServiceError) -> Self {
        MatchError::NetworkFailure(err)
    }
}

impl From<IllegalAction> for MatchError {
    fn from(action: IllegalAction) -> Self {
        MatchError::IllegalAction(action)
    }
}

impl From<DirectoryError> for MatchError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::RoomFull => MatchError::RoomFull,
            DirectoryError::SeatConflict { seat } => MatchError::SeatConflict { seat },
        }
    }
}

impl From<PlacementError> for MatchError {
    fn from(err: PlacementError) -> Self {
        MatchError::IllegalAction(IllegalAction::InvalidLayout(err))
    }
}
