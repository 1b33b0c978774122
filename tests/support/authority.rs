// In-memory stand-in for the authoritative match service. Both seats talk to
// the same instance; notifications land in per-seat outboxes and on any live
// channel subscribers.

use async_trait::async_trait;
use match_client::domain::{
    BoardSnapshot, Clock, Coordinate, GRID_SIZE, Fleet, Grid, MatchService, Participant, Phase,
    PlacedShip, RoomJoined, RoomOptions, RoomSnapshot, Seat, SeatPatch, ServiceError, ShipLayout,
    Shot, ShotOutcome, ShotReceipt,
};
use match_client::interface_adapters::clock::SystemClock;
use match_client::use_cases::Notification;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Manual time when built with `manual`, wall-clock time otherwise.
#[derive(Clone)]
pub struct TestClock(Option<Arc<AtomicU64>>);

impl TestClock {
    pub fn manual(now: u64) -> Self {
        Self(Some(Arc::new(AtomicU64::new(now))))
    }

    pub fn system() -> Self {
        Self(None)
    }

    pub fn advance(&self, by: Duration) {
        let Some(now) = &self.0 else {
            panic!("cannot advance the system clock");
        };
        let millis = u64::try_from(by.as_millis()).expect("duration fits in u64");
        now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_epoch_millis(&self) -> u64 {
        match &self.0 {
            Some(now) => now.load(Ordering::SeqCst),
            None => SystemClock.now_epoch_millis(),
        }
    }
}

#[derive(Default)]
struct SeatBoard {
    ships: Vec<PlacedShip>,
    shots: Vec<Shot>,
    // When this seat last received a shot.
    incoming_at: Option<u64>,
}

struct RoomState {
    room: RoomSnapshot,
    boards: [SeatBoard; 2],
    outboxes: [VecDeque<Notification>; 2],
    subscribers: [Vec<mpsc::UnboundedSender<Notification>>; 2],
}

impl RoomState {
    fn send(&mut self, seat: Seat, notification: Notification) {
        self.outboxes[seat.index()].push_back(notification.clone());
        self.subscribers[seat.index()].retain(|tx| tx.send(notification.clone()).is_ok());
    }

    fn broadcast(&mut self, notification: Notification) {
        for seat in Seat::ALL {
            self.send(seat, notification.clone());
        }
    }
}

fn not_found(what: &str) -> ServiceError {
    ServiceError::Upstream {
        status: 404,
        message: Some(format!("{what} not found")),
    }
}

fn conflict(message: &str) -> ServiceError {
    ServiceError::Upstream {
        status: 409,
        message: Some(message.to_string()),
    }
}

fn bad_request(message: String) -> ServiceError {
    ServiceError::Upstream {
        status: 400,
        message: Some(message),
    }
}

#[derive(Clone)]
pub struct InMemoryService {
    rooms: Arc<Mutex<HashMap<String, RoomState>>>,
    clock: TestClock,
    fleet: Fleet,
}

impl InMemoryService {
    pub fn new(clock: TestClock) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            clock,
            fleet: Fleet::classic(),
        }
    }

    fn with_room<T>(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut RoomState, u64) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let now = self.clock.now_epoch_millis();
        let mut rooms = self.rooms.lock().expect("rooms mutex poisoned");
        let state = rooms.get_mut(room_id).ok_or_else(|| not_found("room"))?;
        f(state, now)
    }

    /// Notifications queued for `seat` since the last drain.
    pub fn drain(&self, room_id: &str, seat: Seat) -> Vec<Notification> {
        self.with_room(room_id, |state, _| Ok(state.outboxes[seat.index()].drain(..).collect()))
            .expect("room exists")
    }

    pub fn room(&self, room_id: &str) -> RoomSnapshot {
        self.with_room(room_id, |state, _| Ok(state.room.clone()))
            .expect("room exists")
    }

    /// Registers a live channel subscriber for the seat held by `player_id`.
    pub fn subscribe(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Option<(Seat, mpsc::UnboundedReceiver<Notification>)> {
        self.with_room(room_id, |state, _| {
            let seat = state.room.seat_of(player_id).ok_or_else(|| not_found("seat"))?;
            let (tx, rx) = mpsc::unbounded_channel();
            state.subscribers[seat.index()].push(tx);
            Ok((seat, rx))
        })
        .ok()
    }

    pub fn subscribers(&self, room_id: &str, seat: Seat) -> usize {
        self.with_room(room_id, |state, _| {
            let live = &mut state.subscribers[seat.index()];
            live.retain(|tx| !tx.is_closed());
            Ok(live.len())
        })
        .unwrap_or(0)
    }

    /// Simulates the channel noticing a seat drop or return.
    pub fn set_presence(&self, room_id: &str, seat: Seat, connected: bool) {
        self.with_room(room_id, |state, _| {
            if let Some(participant) = state.room.seats[seat.index()].as_mut() {
                participant.connected = connected;
            }
            let room_id = state.room.id.clone();
            let notification = if connected {
                Notification::PeerReconnected {
                    room_id,
                    seat: None,
                }
            } else {
                Notification::PeerDisconnected {
                    room_id,
                    seat: None,
                }
            };
            state.send(seat.other(), notification);
            Ok(())
        })
        .expect("room exists");
    }
}

#[async_trait]
impl MatchService for InMemoryService {
    async fn create_room(
        &self,
        name: &str,
        player_id: Option<&str>,
        options: RoomOptions,
    ) -> Result<RoomJoined, ServiceError> {
        let room_id = format!("room-{}", uuid::Uuid::new_v4());
        let player_id = player_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let room = RoomSnapshot {
            id: room_id.clone(),
            phase: Phase::Lobby,
            options,
            seats: [
                Some(Participant {
                    player_id: player_id.clone(),
                    name: name.to_string(),
                    ready: false,
                    connected: true,
                    host: true,
                }),
                None,
            ],
            placement_started_at: None,
            turn_owner: None,
            turn_started_at: None,
            winner: None,
        };
        let state = RoomState {
            room: room.clone(),
            boards: Default::default(),
            outboxes: Default::default(),
            subscribers: Default::default(),
        };
        self.rooms
            .lock()
            .expect("rooms mutex poisoned")
            .insert(room_id, state);
        Ok(RoomJoined {
            room,
            seat: Seat::First,
            player_id,
        })
    }

    async fn join_room(
        &self,
        room_id: &str,
        name: &str,
        player_id: Option<&str>,
    ) -> Result<RoomJoined, ServiceError> {
        self.with_room(room_id, |state, now| {
            if let Some(seat) = player_id.and_then(|id| state.room.seat_of(id)) {
                return Ok(RoomJoined {
                    room: state.room.clone(),
                    seat,
                    player_id: player_id.unwrap_or_default().to_string(),
                });
            }
            let seat = state.room.free_seat().ok_or_else(|| conflict("room is full"))?;
            let player_id = player_id
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            state.room.seats[seat.index()] = Some(Participant {
                player_id: player_id.clone(),
                name: name.to_string(),
                ready: false,
                connected: true,
                host: seat == Seat::First,
            });
            if state.room.free_seat().is_none() && state.room.phase == Phase::Lobby {
                state.room.phase = Phase::Placement;
                state.room.placement_started_at = Some(now);
            }
            let room_id = state.room.id.clone();
            state.broadcast(Notification::SeatJoined {
                room_id,
                seat,
                name: name.to_string(),
            });
            Ok(RoomJoined {
                room: state.room.clone(),
                seat,
                player_id,
            })
        })
    }

    async fn get_room(&self, room_id: &str) -> Result<RoomSnapshot, ServiceError> {
        self.with_room(room_id, |state, _| Ok(state.room.clone()))
    }

    async fn update_seat(
        &self,
        room_id: &str,
        seat: Seat,
        patch: SeatPatch,
    ) -> Result<Participant, ServiceError> {
        self.with_room(room_id, |state, _| {
            let participant = state.room.seats[seat.index()]
                .as_mut()
                .ok_or_else(|| not_found("seat"))?;
            if let Some(connected) = patch.connected {
                participant.connected = connected;
            }
            Ok(participant.clone())
        })
    }

    async fn remove_seat(&self, room_id: &str, seat: Seat) -> Result<(), ServiceError> {
        self.with_room(room_id, |state, _| {
            if state.room.seats[seat.index()].take().is_none() {
                return Err(not_found("seat"));
            }
            state.boards[seat.index()] = SeatBoard::default();
            let room_id = state.room.id.clone();
            state.broadcast(Notification::SeatRemoved { room_id, seat });
            Ok(())
        })
    }

    async fn update_room_status(
        &self,
        room_id: &str,
        status: Phase,
    ) -> Result<RoomSnapshot, ServiceError> {
        self.with_room(room_id, |state, now| {
            if status <= state.room.phase {
                return Err(conflict("status cannot move backwards"));
            }
            state.room.phase = status;
            if status == Phase::Placement {
                state.room.placement_started_at = Some(now);
            }
            Ok(state.room.clone())
        })
    }

    async fn submit_layout(
        &self,
        room_id: &str,
        seat: Seat,
        ships: &[PlacedShip],
    ) -> Result<(), ServiceError> {
        let fleet = self.fleet.clone();
        self.with_room(room_id, |state, now| {
            if state.room.phase != Phase::Placement {
                return Err(conflict("room is not in placement"));
            }
            let layout = ShipLayout::from_ships(fleet, GRID_SIZE, ships.to_vec())
                .map_err(|err| bad_request(err.to_string()))?;
            let participant = state.room.seats[seat.index()]
                .as_mut()
                .ok_or_else(|| not_found("seat"))?;
            if participant.ready {
                return Err(conflict("layout already submitted"));
            }
            participant.ready = true;
            state.boards[seat.index()].ships = layout.into_ships();

            let all_ready = state.room.seats.iter().all(|p| p.as_ref().is_some_and(|p| p.ready));
            if all_ready {
                state.room.phase = Phase::Battle;
                state.room.turn_owner = Some(state.room.options.first_turn);
                state.room.turn_started_at = Some(now);
            }
            let room_id = state.room.id.clone();
            state.broadcast(Notification::PlacementComplete { room_id, seat });
            Ok(())
        })
    }

    async fn get_board(&self, room_id: &str, seat: Seat) -> Result<BoardSnapshot, ServiceError> {
        self.with_room(room_id, |state, _| {
            let own = &state.boards[seat.index()];
            let other = &state.boards[seat.other().index()];
            Ok(BoardSnapshot {
                ships: own.ships.clone(),
                shots: own.shots.clone(),
                opponent_shots: other.shots.clone(),
                opponent_shot_at: own.incoming_at,
            })
        })
    }

    async fn submit_shot(
        &self,
        room_id: &str,
        seat: Seat,
        target: Coordinate,
    ) -> Result<ShotReceipt, ServiceError> {
        self.with_room(room_id, |state, now| {
            if state.room.phase != Phase::Battle {
                return Err(conflict("room is not in battle"));
            }
            if state.room.turn_owner != Some(seat) {
                return Err(conflict("not your turn"));
            }
            if !Grid::new(GRID_SIZE).contains(target) {
                return Err(bad_request(format!("{target} is off the grid")));
            }
            if state.boards[seat.index()].shots.iter().any(|s| s.target == target) {
                return Err(conflict("cell already fired at"));
            }

            let defender = seat.other();
            let outcome = if state.boards[defender.index()]
                .ships
                .iter()
                .any(|ship| ship.occupies(target))
            {
                ShotOutcome::Hit
            } else {
                ShotOutcome::Miss
            };
            state.boards[seat.index()].shots.push(Shot { target, outcome });
            state.boards[defender.index()].incoming_at = Some(now);

            let shots = &state.boards[seat.index()].shots;
            let sunk_all = state.boards[defender.index()].ships.iter().all(|ship| {
                ship.cells.iter().all(|cell| {
                    shots
                        .iter()
                        .any(|s| s.target == *cell && s.outcome == ShotOutcome::Hit)
                })
            });

            let room_id = state.room.id.clone();
            let receipt = if sunk_all {
                state.room.phase = Phase::Ended;
                state.room.winner = Some(seat);
                state.room.turn_owner = None;
                ShotReceipt {
                    outcome,
                    next_turn_started_at: None,
                    winner: Some(seat),
                }
            } else {
                state.room.turn_owner = Some(defender);
                state.room.turn_started_at = Some(now);
                ShotReceipt {
                    outcome,
                    next_turn_started_at: Some(now),
                    winner: None,
                }
            };
            state.broadcast(Notification::ShotFired {
                room_id: room_id.clone(),
                seat,
                target,
                outcome,
                next_turn_started_at: receipt.next_turn_started_at,
            });
            if let Some(winner) = receipt.winner {
                state.broadcast(Notification::MatchEnded { room_id, winner });
            }
            Ok(receipt)
        })
    }

    async fn report_winner(
        &self,
        room_id: &str,
        winner: Seat,
    ) -> Result<RoomSnapshot, ServiceError> {
        self.with_room(room_id, |state, _| {
            // First decision stands; later reports just read it back.
            if state.room.phase == Phase::Ended {
                return Ok(state.room.clone());
            }
            state.room.phase = Phase::Ended;
            state.room.winner = Some(winner);
            state.room.turn_owner = None;
            let room_id = state.room.id.clone();
            state.broadcast(Notification::MatchEnded { room_id, winner });
            Ok(state.room.clone())
        })
    }
}
