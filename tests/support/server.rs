// HTTP and WebSocket front for `InMemoryService`, so the real client adapters
// can be exercised end to end.

use super::authority::InMemoryService;
use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use match_client::domain::{
    Coordinate, MatchService, PlacedShip, RoomOptions, Seat, SeatPatch, ServiceError,
};
use match_client::interface_adapters::protocol::{
    BoardDto, ChannelMessage, ChannelRequest, CreateRoomRequest, ErrorResponse, JoinRoomRequest,
    LayoutRequest, RoomDto, RoomJoinedDto, RoomStatusRequest, SeatDto, SeatPatchDto,
    ShotReceiptDto, WinnerRequest,
};
use match_client::use_cases::Notification;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            ServiceError::Upstream { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message.unwrap_or_default(),
            ),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(service: InMemoryService) -> Router {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{room_id}", get(get_room))
        .route("/rooms/{room_id}/seats", post(join_room))
        .route(
            "/rooms/{room_id}/seats/{seat}",
            axum::routing::patch(update_seat).delete(remove_seat),
        )
        .route("/rooms/{room_id}/status", put(update_status))
        .route("/rooms/{room_id}/seats/{seat}/layout", post(submit_layout))
        .route("/rooms/{room_id}/seats/{seat}/board", get(get_board))
        .route("/rooms/{room_id}/seats/{seat}/shots", post(submit_shot))
        .route("/rooms/{room_id}/winner", post(report_winner))
        .route("/battleship", get(channel))
        .with_state(service)
}

/// Serves `service` on an ephemeral port and returns the base HTTP URL.
pub async fn spawn_server(service: InMemoryService) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, router(service))
            .await
            .expect("serve test router");
    });
    format!("http://{addr}")
}

async fn create_room(
    State(service): State<InMemoryService>,
    Json(body): Json<CreateRoomRequest>,
) -> ApiResult<Json<RoomJoinedDto>> {
    let joined = service
        .create_room(
            &body.name,
            body.player_id.as_deref(),
            RoomOptions::from(body.options),
        )
        .await?;
    Ok(Json(RoomJoinedDto::from(&joined)))
}

async fn join_room(
    State(service): State<InMemoryService>,
    Path(room_id): Path<String>,
    Json(body): Json<JoinRoomRequest>,
) -> ApiResult<Json<RoomJoinedDto>> {
    let joined = service
        .join_room(&room_id, &body.name, body.player_id.as_deref())
        .await?;
    Ok(Json(RoomJoinedDto::from(&joined)))
}

async fn get_room(
    State(service): State<InMemoryService>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<RoomDto>> {
    let room = service.get_room(&room_id).await?;
    Ok(Json(RoomDto::from(&room)))
}

async fn update_seat(
    State(service): State<InMemoryService>,
    Path((room_id, seat)): Path<(String, Seat)>,
    Json(body): Json<SeatPatchDto>,
) -> ApiResult<Json<SeatDto>> {
    let participant = service
        .update_seat(&room_id, seat, SeatPatch::from(body))
        .await?;
    Ok(Json(SeatDto::from_participant(seat, &participant)))
}

async fn remove_seat(
    State(service): State<InMemoryService>,
    Path((room_id, seat)): Path<(String, Seat)>,
) -> ApiResult<StatusCode> {
    service.remove_seat(&room_id, seat).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_status(
    State(service): State<InMemoryService>,
    Path(room_id): Path<String>,
    Json(body): Json<RoomStatusRequest>,
) -> ApiResult<Json<RoomDto>> {
    let room = service.update_room_status(&room_id, body.status).await?;
    Ok(Json(RoomDto::from(&room)))
}

async fn submit_layout(
    State(service): State<InMemoryService>,
    Path((room_id, seat)): Path<(String, Seat)>,
    Json(body): Json<LayoutRequest>,
) -> ApiResult<StatusCode> {
    let ships: Vec<PlacedShip> = body.ships.into_iter().map(PlacedShip::from).collect();
    service.submit_layout(&room_id, seat, &ships).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_board(
    State(service): State<InMemoryService>,
    Path((room_id, seat)): Path<(String, Seat)>,
) -> ApiResult<Json<BoardDto>> {
    let board = service.get_board(&room_id, seat).await?;
    Ok(Json(BoardDto::from(&board)))
}

async fn submit_shot(
    State(service): State<InMemoryService>,
    Path((room_id, seat)): Path<(String, Seat)>,
    Json(target): Json<Coordinate>,
) -> ApiResult<Json<ShotReceiptDto>> {
    let receipt = service.submit_shot(&room_id, seat, target).await?;
    Ok(Json(ShotReceiptDto::from(receipt)))
}

async fn report_winner(
    State(service): State<InMemoryService>,
    Path(room_id): Path<String>,
    Json(body): Json<WinnerRequest>,
) -> ApiResult<Json<RoomDto>> {
    let room = service.report_winner(&room_id, body.winner).await?;
    Ok(Json(RoomDto::from(&room)))
}

async fn channel(ws: WebSocketUpgrade, State(service): State<InMemoryService>) -> Response {
    ws.on_upgrade(move |socket| handle_channel(socket, service))
}

async fn handle_channel(mut socket: WebSocket, service: InMemoryService) {
    let Some((room_id, seat, mut notifications)) = read_subscribe(&mut socket, &service).await
    else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            notification = notifications.recv() => {
                let Some(notification) = notification else { break };
                let text = serde_json::to_string(&ChannelMessage::from(notification))
                    .expect("encode channel frame");
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    service.set_presence(&room_id, seat, false);
}

async fn read_subscribe(
    socket: &mut WebSocket,
    service: &InMemoryService,
) -> Option<(String, Seat, mpsc::UnboundedReceiver<Notification>)> {
    let Some(Ok(Message::Text(text))) = socket.recv().await else {
        return None;
    };
    let ChannelRequest::Subscribe { room_id, player_id } =
        serde_json::from_str::<ChannelRequest>(text.as_str()).ok()?;
    let (seat, notifications) = service.subscribe(&room_id, &player_id)?;

    let returning = service
        .room(&room_id)
        .occupant(seat)
        .is_some_and(|participant| !participant.connected);
    if returning {
        service.set_presence(&room_id, seat, true);
    }
    Some((room_id, seat, notifications))
}
