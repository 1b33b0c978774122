// Wire protocol DTOs and conversions for the match service and push channel.

use crate::domain::{
    BoardSnapshot, Coordinate, Orientation, Participant, Phase, PlacedShip, RoomJoined,
    RoomOptions, RoomSnapshot, Seat, SeatPatch, Shot, ShotOutcome, ShotReceipt,
};
use crate::use_cases::Notification;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timer options as carried on the wire, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOptionsDto {
    pub turn_seconds: u64,
    pub placement_seconds: u64,
    pub first_turn: Seat,
}

impl From<RoomOptions> for RoomOptionsDto {
    fn from(options: RoomOptions) -> Self {
        Self {
            turn_seconds: options.turn_duration.as_secs(),
            placement_seconds: options.placement_duration.as_secs(),
            first_turn: options.first_turn,
        }
    }
}

impl From<RoomOptionsDto> for RoomOptions {
    fn from(options: RoomOptionsDto) -> Self {
        Self {
            turn_duration: Duration::from_secs(options.turn_seconds),
            placement_duration: Duration::from_secs(options.placement_seconds),
            first_turn: options.first_turn,
        }
    }
}

/// One occupied seat inside a room payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatDto {
    pub seat: Seat,
    pub player_id: String,
    pub name: String,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default)]
    pub is_disconnected: bool,
    #[serde(default)]
    pub is_host: bool,
}

impl SeatDto {
    pub fn from_participant(seat: Seat, participant: &Participant) -> Self {
        Self {
            seat,
            player_id: participant.player_id.clone(),
            name: participant.name.clone(),
            is_ready: participant.ready,
            is_disconnected: !participant.connected,
            is_host: participant.host,
        }
    }
}

impl From<SeatDto> for Participant {
    fn from(seat: SeatDto) -> Self {
        Self {
            player_id: seat.player_id,
            name: seat.name,
            ready: seat.is_ready,
            connected: !seat.is_disconnected,
            host: seat.is_host,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDto {
    pub id: String,
    pub status: Phase,
    pub options: RoomOptionsDto,
    #[serde(default)]
    pub seats: Vec<SeatDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_owner: Option<Seat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Seat>,
}

impl From<&RoomSnapshot> for RoomDto {
    fn from(room: &RoomSnapshot) -> Self {
        Self {
            id: room.id.clone(),
            status: room.phase,
            options: room.options.into(),
            seats: Seat::ALL
                .into_iter()
                .filter_map(|seat| {
                    room.occupant(seat)
                        .map(|participant| SeatDto::from_participant(seat, participant))
                })
                .collect(),
            placement_started_at: room.placement_started_at,
            turn_owner: room.turn_owner,
            turn_started_at: room.turn_started_at,
            winner: room.winner,
        }
    }
}

impl From<RoomDto> for RoomSnapshot {
    fn from(room: RoomDto) -> Self {
        let mut seats: [Option<Participant>; 2] = [None, None];
        for seat in room.seats {
            let index = seat.seat.index();
            seats[index] = Some(seat.into());
        }
        Self {
            id: room.id,
            phase: room.status,
            options: room.options.into(),
            seats,
            placement_started_at: room.placement_started_at,
            turn_owner: room.turn_owner,
            turn_started_at: room.turn_started_at,
            winner: room.winner,
        }
    }
}

/// Response to create/join: the room plus the caller's seat binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoinedDto {
    pub room: RoomDto,
    pub seat: Seat,
    pub player_id: String,
}

impl From<&RoomJoined> for RoomJoinedDto {
    fn from(joined: &RoomJoined) -> Self {
        Self {
            room: RoomDto::from(&joined.room),
            seat: joined.seat,
            player_id: joined.player_id.clone(),
        }
    }
}

impl From<RoomJoinedDto> for RoomJoined {
    fn from(joined: RoomJoinedDto) -> Self {
        Self {
            room: joined.room.into(),
            seat: joined.seat,
            player_id: joined.player_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    pub options: RoomOptionsDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SeatPatchDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

impl From<SeatPatch> for SeatPatchDto {
    fn from(patch: SeatPatch) -> Self {
        Self {
            connected: patch.connected,
        }
    }
}

impl From<SeatPatchDto> for SeatPatch {
    fn from(patch: SeatPatchDto) -> Self {
        Self {
            connected: patch.connected,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomStatusRequest {
    pub status: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipDto {
    pub name: String,
    pub size: usize,
    pub orientation: Orientation,
    pub positions: Vec<Coordinate>,
}

impl From<&PlacedShip> for ShipDto {
    fn from(ship: &PlacedShip) -> Self {
        Self {
            name: ship.name.clone(),
            size: ship.size,
            orientation: ship.orientation,
            positions: ship.cells.clone(),
        }
    }
}

impl From<ShipDto> for PlacedShip {
    fn from(ship: ShipDto) -> Self {
        Self {
            name: ship.name,
            size: ship.size,
            orientation: ship.orientation,
            cells: ship.positions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutRequest {
    pub ships: Vec<ShipDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotDto {
    pub position: Coordinate,
    pub status: ShotOutcome,
}

impl From<Shot> for ShotDto {
    fn from(shot: Shot) -> Self {
        Self {
            position: shot.target,
            status: shot.outcome,
        }
    }
}

impl From<ShotDto> for Shot {
    fn from(shot: ShotDto) -> Self {
        Self {
            target: shot.position,
            outcome: shot.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDto {
    #[serde(default)]
    pub ships: Vec<ShipDto>,
    #[serde(default)]
    pub shots: Vec<ShotDto>,
    #[serde(default)]
    pub opponent_shots: Vec<ShotDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_shot_at: Option<u64>,
}

impl From<&BoardSnapshot> for BoardDto {
    fn from(board: &BoardSnapshot) -> Self {
        Self {
            ships: board.ships.iter().map(ShipDto::from).collect(),
            shots: board.shots.iter().copied().map(ShotDto::from).collect(),
            opponent_shots: board.opponent_shots.iter().copied().map(ShotDto::from).collect(),
            opponent_shot_at: board.opponent_shot_at,
        }
    }
}

impl From<BoardDto> for BoardSnapshot {
    fn from(board: BoardDto) -> Self {
        Self {
            ships: board.ships.into_iter().map(PlacedShip::from).collect(),
            shots: board.shots.into_iter().map(Shot::from).collect(),
            opponent_shots: board.opponent_shots.into_iter().map(Shot::from).collect(),
            opponent_shot_at: board.opponent_shot_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotReceiptDto {
    pub status: ShotOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_turn_started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Seat>,
}

impl From<ShotReceipt> for ShotReceiptDto {
    fn from(receipt: ShotReceipt) -> Self {
        Self {
            status: receipt.outcome,
            next_turn_started_at: receipt.next_turn_started_at,
            winner: receipt.winner,
        }
    }
}

impl From<ShotReceiptDto> for ShotReceipt {
    fn from(receipt: ShotReceiptDto) -> Self {
        Self {
            outcome: receipt.status,
            next_turn_started_at: receipt.next_turn_started_at,
            winner: receipt.winner,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WinnerRequest {
    pub winner: Seat,
}

/// Body of every non-success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Push frames the channel delivers to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ChannelMessage {
    SeatJoined {
        room_id: String,
        seat: Seat,
        name: String,
    },
    // A missing seat means "the receiver's opponent".
    PeerDisconnected {
        room_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seat: Option<Seat>,
    },
    PeerReconnected {
        room_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seat: Option<Seat>,
    },
    PlacementComplete {
        room_id: String,
        seat: Seat,
    },
    ShotFired {
        room_id: String,
        seat: Seat,
        position: Coordinate,
        status: ShotOutcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
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

impl From<ChannelMessage> for Notification {
    fn from(message: ChannelMessage) -> Self {
        match message {
            ChannelMessage::SeatJoined {
                room_id,
                seat,
                name,
            } => Notification::SeatJoined {
                room_id,
                seat,
                name,
            },
            ChannelMessage::PeerDisconnected { room_id, seat } => {
                Notification::PeerDisconnected { room_id, seat }
            }
            ChannelMessage::PeerReconnected { room_id, seat } => {
                Notification::PeerReconnected { room_id, seat }
            }
            ChannelMessage::PlacementComplete { room_id, seat } => {
                Notification::PlacementComplete { room_id, seat }
            }
            ChannelMessage::ShotFired {
                room_id,
                seat,
                position,
                status,
                next_turn_started_at,
            } => Notification::ShotFired {
                room_id,
                seat,
                target: position,
                outcome: status,
                next_turn_started_at,
            },
            ChannelMessage::MatchEnded { room_id, winner } => {
                Notification::MatchEnded { room_id, winner }
            }
            ChannelMessage::SeatRemoved { room_id, seat } => {
                Notification::SeatRemoved { room_id, seat }
            }
            ChannelMessage::ChatMessage { room_id } => Notification::ChatMessage { room_id },
        }
    }
}

impl From<Notification> for ChannelMessage {
    fn from(notification: Notification) -> Self {
        match notification {
            Notification::SeatJoined {
                room_id,
                seat,
                name,
            } => ChannelMessage::SeatJoined {
                room_id,
                seat,
                name,
            },
            Notification::PeerDisconnected { room_id, seat } => {
                ChannelMessage::PeerDisconnected { room_id, seat }
            }
            Notification::PeerReconnected { room_id, seat } => {
                ChannelMessage::PeerReconnected { room_id, seat }
            }
            Notification::PlacementComplete { room_id, seat } => {
                ChannelMessage::PlacementComplete { room_id, seat }
            }
            Notification::ShotFired {
                room_id,
                seat,
                target,
                outcome,
                next_turn_started_at,
            } => ChannelMessage::ShotFired {
                room_id,
                seat,
                position: target,
                status: outcome,
                next_turn_started_at,
            },
            Notification::MatchEnded { room_id, winner } => {
                ChannelMessage::MatchEnded { room_id, winner }
            }
            Notification::SeatRemoved { room_id, seat } => {
                ChannelMessage::SeatRemoved { room_id, seat }
            }
            Notification::ChatMessage { room_id } => ChannelMessage::ChatMessage { room_id },
        }
    }
}

/// Frames the client sends on the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ChannelRequest {
    Subscribe { room_id: String, player_id: String },
}

/// Decodes one text frame into a notification.
pub fn decode_notification(text: &str) -> Result<Notification, serde_json::Error> {
    serde_json::from_str::<ChannelMessage>(text).map(Notification::from)
}
