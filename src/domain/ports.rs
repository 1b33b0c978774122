use async_trait::async_trait;

use crate::domain::board::{BoardSnapshot, ShotReceipt};
use crate::domain::errors::ServiceError;
use crate::domain::fleet::PlacedShip;
use crate::domain::grid::Coordinate;
use crate::domain::room::{Participant, Phase, RoomJoined, RoomOptions, RoomSnapshot, Seat, SeatPatch};

// Request/response port to the authoritative match service.
// The state machine depends on this trait, not on the HTTP client.
#[async_trait]
pub trait MatchService: Send + Sync {
    async fn create_room(
        &self,
        name: &str,
        player_id: Option<&str>,
        options: RoomOptions,
    ) -> Result<RoomJoined, ServiceError>;

    async fn join_room(
        &self,
        room_id: &str,
        name: &str,
        player_id: Option<&str>,
    ) -> Result<RoomJoined, ServiceError>;

    async fn get_room(&self, room_id: &str) -> Result<RoomSnapshot, ServiceError>;

    async fn update_seat(
        &self,
        room_id: &str,
        seat: Seat,
        patch: SeatPatch,
    ) -> Result<Participant, ServiceError>;

    async fn remove_seat(&self, room_id: &str, seat: Seat) -> Result<(), ServiceError>;

    async fn update_room_status(
        &self,
        room_id: &str,
        status: Phase,
    ) -> Result<RoomSnapshot, ServiceError>;

    async fn submit_layout(
        &self,
        room_id: &str,
        seat: Seat,
        ships: &[PlacedShip],
    ) -> Result<(), ServiceError>;

    async fn get_board(&self, room_id: &str, seat: Seat) -> Result<BoardSnapshot, ServiceError>;

    async fn submit_shot(
        &self,
        room_id: &str,
        seat: Seat,
        target: Coordinate,
    ) -> Result<ShotReceipt, ServiceError>;

    // Used both for timeout forfeits and as the generic "decide the match" call.
    async fn report_winner(&self, room_id: &str, winner: Seat)
    -> Result<RoomSnapshot, ServiceError>;
}

// Port for retrieving the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}
