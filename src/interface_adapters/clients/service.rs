use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::domain::{
    BoardSnapshot, Coordinate, MatchService, Participant, Phase, PlacedShip, RoomJoined,
    RoomOptions, RoomSnapshot, Seat, SeatPatch, ServiceError, ShotReceipt,
};
use crate::interface_adapters::protocol::{
    BoardDto, CreateRoomRequest, ErrorResponse, JoinRoomRequest, LayoutRequest, RoomDto,
    RoomJoinedDto, RoomStatusRequest, SeatDto, SeatPatchDto, ShipDto, ShotReceiptDto,
    WinnerRequest,
};

// Thin reqwest client for the authoritative match service.
#[derive(Clone)]
pub struct HttpMatchService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMatchService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn room_url(&self, room_id: &str) -> String {
        format!("{}/rooms/{room_id}", self.base_url)
    }

    fn seat_url(&self, room_id: &str, seat: Seat) -> String {
        format!("{}/seats/{}", self.room_url(room_id), seat.as_str())
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ServiceError> {
    let response = request
        .send()
        .await
        .map_err(|err| ServiceError::Transport(err.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    // The error body is informational; a missing or odd body keeps the status.
    let message = response
        .json::<ErrorResponse>()
        .await
        .ok()
        .map(|body| body.message);
    Err(ServiceError::Upstream {
        status: status.as_u16(),
        message,
    })
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ServiceError> {
    send(request)
        .await?
        .json::<T>()
        .await
        .map_err(|err| ServiceError::Decode(err.to_string()))
}

#[async_trait]
impl MatchService for HttpMatchService {
    async fn create_room(
        &self,
        name: &str,
        player_id: Option<&str>,
        options: RoomOptions,
    ) -> Result<RoomJoined, ServiceError> {
        let body = CreateRoomRequest {
            name: name.to_string(),
            player_id: player_id.map(str::to_string),
            options: options.into(),
        };
        let request = self.http.post(format!("{}/rooms", self.base_url)).json(&body);
        send_json::<RoomJoinedDto>(request).await.map(RoomJoined::from)
    }

    async fn join_room(
        &self,
        room_id: &str,
        name: &str,
        player_id: Option<&str>,
    ) -> Result<RoomJoined, ServiceError> {
        let body = JoinRoomRequest {
            name: name.to_string(),
            player_id: player_id.map(str::to_string),
        };
        let request = self
            .http
            .post(format!("{}/seats", self.room_url(room_id)))
            .json(&body);
        send_json::<RoomJoinedDto>(request).await.map(RoomJoined::from)
    }

    async fn get_room(&self, room_id: &str) -> Result<RoomSnapshot, ServiceError> {
        let request = self.http.get(self.room_url(room_id));
        send_json::<RoomDto>(request).await.map(RoomSnapshot::from)
    }

    async fn update_seat(
        &self,
        room_id: &str,
        seat: Seat,
        patch: SeatPatch,
    ) -> Result<Participant, ServiceError> {
        let request = self
            .http
            .patch(self.seat_url(room_id, seat))
            .json(&SeatPatchDto::from(patch));
        send_json::<SeatDto>(request).await.map(Participant::from)
    }

    async fn remove_seat(&self, room_id: &str, seat: Seat) -> Result<(), ServiceError> {
        send(self.http.delete(self.seat_url(room_id, seat))).await?;
        Ok(())
    }

    async fn update_room_status(
        &self,
        room_id: &str,
        status: Phase,
    ) -> Result<RoomSnapshot, ServiceError> {
        let request = self
            .http
            .put(format!("{}/status", self.room_url(room_id)))
            .json(&RoomStatusRequest { status });
        send_json::<RoomDto>(request).await.map(RoomSnapshot::from)
    }

    async fn submit_layout(
        &self,
        room_id: &str,
        seat: Seat,
        ships: &[PlacedShip],
    ) -> Result<(), ServiceError> {
        let body = LayoutRequest {
            ships: ships.iter().map(ShipDto::from).collect(),
        };
        let request = self
            .http
            .post(format!("{}/layout", self.seat_url(room_id, seat)))
            .json(&body);
        send(request).await?;
        Ok(())
    }

    async fn get_board(&self, room_id: &str, seat: Seat) -> Result<BoardSnapshot, ServiceError> {
        let request = self
            .http
            .get(format!("{}/board", self.seat_url(room_id, seat)));
        send_json::<BoardDto>(request).await.map(BoardSnapshot::from)
    }

    async fn submit_shot(
        &self,
        room_id: &str,
        seat: Seat,
        target: Coordinate,
    ) -> Result<ShotReceipt, ServiceError> {
        let request = self
            .http
            .post(format!("{}/shots", self.seat_url(room_id, seat)))
            .json(&target);
        send_json::<ShotReceiptDto>(request).await.map(ShotReceipt::from)
    }

    async fn report_winner(
        &self,
        room_id: &str,
        winner: Seat,
    ) -> Result<RoomSnapshot, ServiceError> {
        let request = self
            .http
            .post(format!("{}/winner", self.room_url(room_id)))
            .json(&WinnerRequest { winner });
        send_json::<RoomDto>(request).await.map(RoomSnapshot::from)
    }
}
