// Match synchronization state machine.

use crate::domain::{
    Board, Clock, Coordinate, Deadline, DeadlineClock, Fleet, GRID_SIZE, Grid, IllegalAction,
    MatchError, MatchService, OwnBoard, Participant, Phase, PlacedShip, PresenceChange,
    PresenceSignal, PresenceTracker, RoomJoined, RoomOptions, RoomSnapshot, Seat, SeatDirectory,
    SeatPatch, ServiceError, Settlement, ShipLayout, ShotOutcome,
};
use crate::use_cases::types::{ExitReason, MatchView, Notice, Notification};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for a session. Defaults match the classic game.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub fleet: Fleet,
    pub grid_size: usize,
    /// Attempts for idempotent reads and the forfeit report.
    pub read_attempts: u32,
    /// Fixed pause between read attempts.
    pub retry_backoff: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            fleet: Fleet::classic(),
            grid_size: GRID_SIZE,
            read_attempts: 3,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Readiness {
    #[default]
    NotReady,
    Pending,
    Confirmed,
}

// The single speculative own action awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    Layout,
    Shot { target: Coordinate },
}

/// Guess recorded on the opponent board while a shot is in flight.
const OPTIMISTIC_GUESS: ShotOutcome = ShotOutcome::Miss;

/// One client's projection of a match, reconciled against the match service.
///
/// All mutation goes through `&mut self`, so handlers run to completion one at
/// a time. Callers feed it push notifications, clock ticks, and user actions.
pub struct MatchSession<S, C> {
    service: S,
    clock: C,
    settings: SessionSettings,
    identity: String,
    room_id: String,
    phase: Phase,
    options: RoomOptions,
    turn_owner: Option<Seat>,
    winner: Option<Seat>,
    directory: SeatDirectory,
    presence: PresenceTracker,
    placement_clock: DeadlineClock,
    turn_clock: DeadlineClock,
    // Set when a committed turn change could not be re-anchored.
    turn_unanchored: bool,
    readiness: [Readiness; 2],
    own_board: OwnBoard,
    opponent_board: Board,
    pending: Option<PendingAction>,
    notices: VecDeque<Notice>,
    end_announced: bool,
    exited: Option<ExitReason>,
}

impl<S, C> MatchSession<S, C>
where
    S: MatchService,
    C: Clock,
{
    /// Creates a room and binds the local identity to the host seat.
    pub async fn create(
        service: S,
        clock: C,
        settings: SessionSettings,
        name: &str,
        player_id: Option<&str>,
        options: RoomOptions,
    ) -> Result<Self, MatchError> {
        let joined = service.create_room(name, player_id, options).await?;
        Self::from_joined(service, clock, settings, joined).await
    }

    /// Joins an existing room.
    pub async fn join(
        service: S,
        clock: C,
        settings: SessionSettings,
        room_id: &str,
        name: &str,
        player_id: Option<&str>,
    ) -> Result<Self, MatchError> {
        let joined = service.join_room(room_id, name, player_id).await?;
        Self::from_joined(service, clock, settings, joined).await
    }

    /// Builds a session from a confirmed seat binding.
    pub async fn from_joined(
        service: S,
        clock: C,
        settings: SessionSettings,
        joined: RoomJoined,
    ) -> Result<Self, MatchError> {
        let RoomJoined {
            room,
            seat,
            player_id,
        } = joined;
        let mut session = Self {
            service,
            clock,
            settings,
            identity: player_id,
            room_id: room.id.clone(),
            phase: Phase::Lobby,
            options: room.options,
            turn_owner: None,
            winner: None,
            directory: SeatDirectory::new(),
            presence: PresenceTracker::new(),
            placement_clock: DeadlineClock::new(),
            turn_clock: DeadlineClock::new(),
            turn_unanchored: false,
            readiness: [Readiness::NotReady; 2],
            own_board: OwnBoard::default(),
            opponent_board: Board::default(),
            pending: None,
            notices: VecDeque::new(),
            end_announced: false,
            exited: None,
        };

        session.apply_room(room)?;
        match session.local_seat() {
            Some(resolved) if resolved == seat => {
                info!(room_id = %session.room_id, seat = %seat, "seat bound");
            }
            Some(resolved) => return Err(MatchError::SeatConflict { seat: resolved }),
            None => return Err(IllegalAction::SeatUnresolved.into()),
        }

        if session.phase >= Phase::Battle {
            session.sync_board().await?;
        }
        Ok(session)
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn options(&self) -> RoomOptions {
        self.options
    }

    pub fn local_seat(&self) -> Option<Seat> {
        self.directory.local_seat()
    }

    pub fn turn_owner(&self) -> Option<Seat> {
        self.turn_owner
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn occupant(&self, seat: Seat) -> Option<&Participant> {
        self.directory.occupant(seat)
    }

    pub fn is_connected(&self, seat: Seat) -> bool {
        self.presence.is_connected(seat)
    }

    /// True once the seat's layout has been confirmed by the service.
    pub fn is_ready(&self, seat: Seat) -> bool {
        self.readiness[seat.index()] == Readiness::Confirmed
    }

    pub fn own_board(&self) -> &OwnBoard {
        &self.own_board
    }

    pub fn opponent_board(&self) -> &Board {
        &self.opponent_board
    }

    /// Target of the local shot still awaiting confirmation.
    pub fn pending_shot(&self) -> Option<Coordinate> {
        match self.pending {
            Some(PendingAction::Shot { target }) => Some(target),
            _ => None,
        }
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exited
    }

    pub fn turn_deadline(&self) -> Option<Deadline> {
        self.turn_clock.deadline()
    }

    pub fn placement_deadline(&self) -> Option<Deadline> {
        self.placement_clock.deadline()
    }

    /// Remaining time on whichever deadline governs the current phase.
    pub fn remaining(&self) -> Option<Duration> {
        let now = self.clock.now_epoch_millis();
        match self.phase {
            Phase::Placement => self.placement_clock.remaining(now),
            Phase::Battle => self.turn_clock.remaining(now),
            Phase::Lobby | Phase::Ended => None,
        }
    }

    /// Whether `fire_shot` would pass local validation for some untargeted cell.
    /// Opponent connectivity is reported separately in [`MatchView`].
    pub fn can_fire(&self) -> bool {
        self.exited.is_none()
            && self.phase == Phase::Battle
            && self.pending.is_none()
            && self.turn_owner.is_some()
            && self.turn_owner == self.local_seat()
    }

    pub fn view(&self) -> MatchView {
        let opponent_connected = self
            .local_seat()
            .is_none_or(|seat| self.presence.is_connected(seat.other()));
        MatchView {
            room_id: self.room_id.clone(),
            phase: self.phase,
            local_seat: self.local_seat(),
            turn_owner: self.turn_owner,
            remaining: self.remaining(),
            winner: self.winner,
            can_fire: self.can_fire(),
            opponent_connected,
            exited: self.exited,
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Re-reads the room snapshot and reconciles against it.
    pub async fn refresh(&mut self) -> Result<(), MatchError> {
        if self.exited.is_some() {
            return Ok(());
        }
        let service = &self.service;
        let room_id = self.room_id.as_str();
        let room = retry_read(&self.settings, "get_room", move || service.get_room(room_id)).await?;
        self.apply_room(room)?;
        self.turn_unanchored = false;
        Ok(())
    }

    /// Full resync after a channel drop: room first, then the board once
    /// combat has started.
    pub async fn resync(&mut self) -> Result<(), MatchError> {
        self.refresh().await?;
        if self.exited.is_none() && self.phase >= Phase::Battle {
            self.sync_board().await?;
        }
        Ok(())
    }

    /// Submits the complete layout exactly once.
    pub async fn submit_layout(&mut self, ships: Vec<PlacedShip>) -> Result<(), MatchError> {
        let seat = self.ensure_phase(Phase::Placement)?;
        match self.readiness[seat.index()] {
            Readiness::Confirmed => return Err(IllegalAction::LayoutAlreadySubmitted.into()),
            Readiness::Pending => return Err(IllegalAction::ActionPending.into()),
            Readiness::NotReady => {}
        }
        if self.pending.is_some() {
            return Err(IllegalAction::ActionPending.into());
        }
        let layout = ShipLayout::from_ships(self.settings.fleet.clone(), self.settings.grid_size, ships)?;
        let ships = layout.into_ships();

        self.pending = Some(PendingAction::Layout);
        self.readiness[seat.index()] = Readiness::Pending;
        self.own_board.ships = ships.clone();

        if let Err(err) = self.service.submit_layout(&self.room_id, seat, &ships).await {
            warn!(room_id = %self.room_id, seat = %seat, error = %err, "layout submission failed");
            self.pending = None;
            self.readiness[seat.index()] = Readiness::NotReady;
            self.own_board.ships.clear();
            return Err(err.into());
        }

        self.confirm_ready(seat);
        if self.check_placement_exit() {
            self.reanchor_turn().await;
        }
        Ok(())
    }

    /// Fires at `target`. The turn stays with the local seat until the service
    /// confirms the shot.
    pub async fn fire_shot(&mut self, target: Coordinate) -> Result<ShotOutcome, MatchError> {
        let seat = self.ensure_phase(Phase::Battle)?;
        if !Grid::new(self.settings.grid_size).contains(target) {
            return Err(IllegalAction::OutOfBounds(target).into());
        }
        if self.turn_owner != Some(seat) {
            return Err(IllegalAction::NotYourTurn.into());
        }
        if self.opponent_board.is_targeted(target) {
            return Err(IllegalAction::AlreadyTargeted(target).into());
        }
        if self.pending.is_some() {
            return Err(IllegalAction::ActionPending.into());
        }

        self.pending = Some(PendingAction::Shot { target });
        self.opponent_board.mark_optimistic(target, OPTIMISTIC_GUESS);

        let receipt = match self.service.submit_shot(&self.room_id, seat, target).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(room_id = %self.room_id, target = %target, error = %err, "shot submission failed");
                self.pending = None;
                self.opponent_board.rollback(target);
                return Err(err.into());
            }
        };

        let needs_anchor =
            self.apply_confirmed_shot(seat, target, receipt.outcome, receipt.next_turn_started_at);
        if let Some(winner) = receipt.winner {
            self.finish(Some(winner));
        } else if needs_anchor {
            self.reanchor_turn().await;
        }
        Ok(receipt.outcome)
    }

    /// Host-only: moves a full lobby into placement.
    pub async fn start_placement(&mut self) -> Result<(), MatchError> {
        let seat = self.ensure_phase(Phase::Lobby)?;
        if seat != Seat::First {
            return Err(IllegalAction::NotHost.into());
        }
        if self.directory.opponent().is_none() {
            return Err(IllegalAction::OpponentMissing.into());
        }
        let room = self
            .service
            .update_room_status(&self.room_id, Phase::Placement)
            .await?;
        self.apply_room(room)
    }

    /// Host-only: removes the guest from the lobby.
    pub async fn kick_opponent(&mut self) -> Result<(), MatchError> {
        let seat = self.ensure_phase(Phase::Lobby)?;
        if seat != Seat::First {
            return Err(IllegalAction::NotHost.into());
        }
        let guest = seat.other();
        if self.directory.occupant(guest).is_none() {
            return Err(IllegalAction::OpponentMissing.into());
        }
        self.service.remove_seat(&self.room_id, guest).await?;
        self.vacate(guest);
        Ok(())
    }

    /// Leaves the match. In the lobby the seat is released upstream; later
    /// phases only detach locally and leave the consequence to the service.
    pub async fn leave(&mut self) -> Result<(), MatchError> {
        if self.exited.is_some() {
            return Ok(());
        }
        if self.phase == Phase::Lobby {
            if let Some(seat) = self.local_seat() {
                self.service.remove_seat(&self.room_id, seat).await?;
            }
        }
        self.exit(ExitReason::Left);
        Ok(())
    }

    /// Reconciles one push notification.
    pub async fn handle_notification(&mut self, notification: Notification) -> Result<(), MatchError> {
        if notification.room_id() != self.room_id {
            debug!(
                room_id = %notification.room_id(),
                current = %self.room_id,
                "ignoring notification for another room"
            );
            return Err(MatchError::StaleNotification {
                room_id: notification.room_id().to_string(),
            });
        }
        if self.exited.is_some() {
            debug!(room_id = %self.room_id, "ignoring notification after exit");
            return Ok(());
        }

        match notification {
            Notification::SeatJoined { seat, name, .. } => {
                debug!(room_id = %self.room_id, seat = %seat, name = %name, "seat joined; refreshing");
                if self.phase != Phase::Ended {
                    self.refresh().await?;
                }
            }
            Notification::PeerDisconnected { seat, .. } => {
                self.apply_presence(PresenceSignal {
                    seat,
                    connected: false,
                })
                .await;
            }
            Notification::PeerReconnected { seat, .. } => {
                self.apply_presence(PresenceSignal {
                    seat,
                    connected: true,
                })
                .await;
            }
            Notification::PlacementComplete { seat, .. } => {
                if self.phase != Phase::Placement {
                    debug!(room_id = %self.room_id, seat = %seat, phase = %self.phase, "late placement signal");
                    return Ok(());
                }
                if self.readiness[seat.index()] == Readiness::Confirmed {
                    debug!(room_id = %self.room_id, seat = %seat, "duplicate placement signal");
                    return Ok(());
                }
                self.confirm_ready(seat);
                if self.check_placement_exit() {
                    self.reanchor_turn().await;
                }
            }
            Notification::ShotFired {
                seat,
                target,
                outcome,
                next_turn_started_at,
                ..
            } => {
                if self.phase < Phase::Battle {
                    self.refresh().await?;
                }
                let needs_anchor = self.apply_confirmed_shot(seat, target, outcome, next_turn_started_at);
                if needs_anchor {
                    self.reanchor_turn().await;
                }
            }
            Notification::MatchEnded { winner, .. } => {
                self.finish(Some(winner));
            }
            Notification::SeatRemoved { seat, .. } => {
                if Some(seat) == self.local_seat() {
                    info!(room_id = %self.room_id, seat = %seat, "removed from room");
                    self.notices.push_back(Notice::RemovedFromRoom);
                    self.exit(ExitReason::Removed);
                } else {
                    self.vacate(seat);
                }
            }
            Notification::ChatMessage { .. } => {
                self.notices.push_back(Notice::ChatMessage);
            }
        }
        Ok(())
    }

    /// Advances the deadline clocks. Expiry only ever triggers a report or a
    /// re-read; the resulting transition comes from the service.
    pub async fn tick(&mut self) -> Result<(), MatchError> {
        if self.exited.is_some() || self.phase == Phase::Ended {
            return Ok(());
        }
        let now = self.clock.now_epoch_millis();
        match self.phase {
            Phase::Placement => {
                let expired = self.placement_clock.tick(now).is_some_and(|t| t.expired);
                if expired {
                    info!(room_id = %self.room_id, "placement deadline expired");
                    self.notices.push_back(Notice::PlacementDeadlineExpired);
                    self.refresh().await?;
                }
            }
            Phase::Battle => {
                if self.turn_unanchored {
                    self.refresh().await?;
                }
                let expired = self.turn_clock.tick(now).is_some_and(|t| t.expired);
                let Some(owner) = self.turn_owner.filter(|_| expired) else {
                    return Ok(());
                };
                info!(room_id = %self.room_id, seat = %owner, "turn deadline expired");
                self.notices.push_back(Notice::TurnDeadlineExpired { seat: owner });
                if Some(owner) == self.local_seat() {
                    self.report_forfeit(owner).await?;
                }
            }
            Phase::Lobby | Phase::Ended => {}
        }
        Ok(())
    }

    // The turn change is already committed, so a failed read only leaves the
    // clock unanchored until the next tick or resync.
    async fn reanchor_turn(&mut self) {
        if let Err(err) = self.refresh().await {
            warn!(room_id = %self.room_id, error = %err, "turn clock re-anchor failed");
            self.turn_unanchored = true;
        }
    }

    async fn report_forfeit(&mut self, loser: Seat) -> Result<(), MatchError> {
        let service = &self.service;
        let room_id = self.room_id.as_str();
        let winner = loser.other();
        let room = retry_read(&self.settings, "report_winner", move || {
            service.report_winner(room_id, winner)
        })
        .await?;
        self.apply_room(room)
    }

    async fn sync_board(&mut self) -> Result<(), MatchError> {
        let Some(seat) = self.local_seat() else {
            return Err(IllegalAction::SeatUnresolved.into());
        };
        let service = &self.service;
        let room_id = self.room_id.as_str();
        let board =
            retry_read(&self.settings, "get_board", move || service.get_board(room_id, seat)).await?;

        if !board.ships.is_empty() {
            self.own_board.ships = board.ships;
            self.readiness[seat.index()] = Readiness::Confirmed;
        }
        for shot in board.shots {
            self.settle_own_shot(shot.target, shot.outcome);
        }
        if let Some(PendingAction::Shot { target }) = self.pending {
            // The service never recorded it.
            self.pending = None;
            self.opponent_board.rollback(target);
        }
        if self.pending == Some(PendingAction::Layout) {
            self.pending = None;
        }
        for shot in board.opponent_shots {
            self.own_board.incoming.settle(shot.target, shot.outcome);
        }
        if board.opponent_shot_at.is_some() {
            self.own_board.last_incoming_at = board.opponent_shot_at;
        }

        if self.phase == Phase::Battle && !self.turn_clock.is_running() {
            if let Some(origin) = self.own_board.last_incoming_at {
                self.turn_clock
                    .anchor(Deadline::new(origin, self.options.turn_duration));
            }
        }
        Ok(())
    }

    async fn apply_presence(&mut self, signal: PresenceSignal) {
        let Some(change) = self.presence.apply(signal) else {
            debug!(room_id = %self.room_id, "presence signal produced no change");
            return;
        };
        self.announce_presence(change);

        if Some(change.seat) == self.local_seat() {
            return;
        }
        let patch = SeatPatch {
            connected: Some(change.connected),
        };
        if let Err(err) = self.service.update_seat(&self.room_id, change.seat, patch).await {
            warn!(
                room_id = %self.room_id,
                seat = %change.seat,
                error = %err,
                "failed to report peer connectivity"
            );
        }
    }

    fn announce_presence(&mut self, change: PresenceChange) {
        info!(
            room_id = %self.room_id,
            seat = %change.seat,
            connected = change.connected,
            "peer connectivity changed"
        );
        self.notices.push_back(if change.connected {
            Notice::PeerReconnected { seat: change.seat }
        } else {
            Notice::PeerDisconnected { seat: change.seat }
        });
    }

    fn apply_room(&mut self, room: RoomSnapshot) -> Result<(), MatchError> {
        if room.id != self.room_id {
            return Err(MatchError::StaleNotification { room_id: room.id });
        }
        let previous_opponent = self.directory.opponent().map(|p| p.player_id.clone());
        let seat = self.directory.resolve_seat(&self.identity, &room)?;

        for change in self.presence.bind_local(seat) {
            self.announce_presence(change);
        }
        let opponent_seat = seat.other();
        match room.occupant(opponent_seat) {
            Some(opponent) => {
                if previous_opponent.as_deref() != Some(opponent.player_id.as_str()) {
                    info!(room_id = %self.room_id, name = %opponent.name, "opponent joined");
                    self.notices.push_back(Notice::OpponentJoined {
                        name: opponent.name.clone(),
                    });
                }
                for change in self.presence.seat_bound(opponent_seat, opponent.connected) {
                    self.announce_presence(change);
                }
            }
            None => self.presence.seat_vacated(opponent_seat),
        }

        self.options = room.options;
        for seat in Seat::ALL {
            if room.occupant(seat).is_some_and(|p| p.ready) {
                self.confirm_ready(seat);
            }
        }

        self.advance_phase(room.phase);
        match self.phase {
            Phase::Placement => {
                if let Some(origin) = room.placement_started_at {
                    self.placement_clock
                        .anchor(Deadline::new(origin, self.options.placement_duration));
                }
                self.check_placement_exit();
            }
            Phase::Battle => {
                if room.turn_owner.is_some() {
                    self.turn_owner = room.turn_owner;
                }
                if let Some(origin) = room.turn_started_at {
                    self.turn_clock
                        .anchor(Deadline::new(origin, self.options.turn_duration));
                }
            }
            Phase::Ended => self.finish(room.winner),
            Phase::Lobby => {}
        }
        Ok(())
    }

    // Moves forward only; a stale snapshot never drags the phase back.
    fn advance_phase(&mut self, next: Phase) -> bool {
        if next <= self.phase {
            return false;
        }
        let previous = self.phase;
        self.phase = next;
        info!(room_id = %self.room_id, from = %previous, phase = %next, "phase changed");
        self.notices.push_back(Notice::PhaseChanged(next));

        if previous == Phase::Placement || next > Phase::Placement {
            self.placement_clock.cancel();
        }
        match next {
            Phase::Battle => {
                if self.turn_owner.is_none() {
                    self.turn_owner = Some(self.options.first_turn);
                }
            }
            Phase::Ended => {
                self.turn_clock.cancel();
                self.discard_pending();
            }
            Phase::Lobby | Phase::Placement => {}
        }
        true
    }

    fn confirm_ready(&mut self, seat: Seat) {
        self.readiness[seat.index()] = Readiness::Confirmed;
        if Some(seat) == self.local_seat() && self.pending == Some(PendingAction::Layout) {
            self.pending = None;
        }
    }

    // Local readiness plus confirmed opposite readiness ends placement.
    // Returns true when the turn deadline still needs an authoritative anchor.
    fn check_placement_exit(&mut self) -> bool {
        if self.phase != Phase::Placement {
            return false;
        }
        if !self.readiness.iter().all(|r| *r == Readiness::Confirmed) {
            return false;
        }
        self.advance_phase(Phase::Battle);
        !self.turn_clock.is_running()
    }

    // Returns true when the turn changed but no origin came with it.
    fn apply_confirmed_shot(
        &mut self,
        shooter: Seat,
        target: Coordinate,
        outcome: ShotOutcome,
        next_turn_started_at: Option<u64>,
    ) -> bool {
        let local = self.local_seat();
        let settlement = if Some(shooter) == local {
            self.settle_own_shot(target, outcome)
        } else {
            let settlement = self.own_board.incoming.settle(target, outcome);
            if settlement != Settlement::Duplicate {
                if let Some(at) = next_turn_started_at {
                    self.own_board.last_incoming_at = Some(at);
                }
            }
            settlement
        };

        if settlement == Settlement::Duplicate {
            debug!(room_id = %self.room_id, seat = %shooter, target = %target, "duplicate shot signal");
            return false;
        }
        if self.phase != Phase::Battle {
            return false;
        }

        self.turn_owner = Some(shooter.other());
        match next_turn_started_at {
            Some(origin) => {
                self.turn_clock
                    .anchor(Deadline::new(origin, self.options.turn_duration));
                false
            }
            None => {
                self.turn_clock.cancel();
                true
            }
        }
    }

    fn settle_own_shot(&mut self, target: Coordinate, outcome: ShotOutcome) -> Settlement {
        let settlement = self.opponent_board.settle(target, outcome);
        if self.pending == Some(PendingAction::Shot { target }) {
            self.pending = None;
        }
        if let Settlement::Settled { guess: Some(guessed) } = settlement {
            if guessed != outcome {
                warn!(
                    room_id = %self.room_id,
                    target = %target,
                    guessed = ?guessed,
                    actual = ?outcome,
                    "authoritative outcome overrides local guess"
                );
                self.notices.push_back(Notice::AuthorityMismatch {
                    target,
                    guessed,
                    actual: outcome,
                });
            }
        }
        settlement
    }

    fn finish(&mut self, winner: Option<Seat>) {
        self.advance_phase(Phase::Ended);
        if self.winner.is_none() {
            self.winner = winner;
        }
        if self.end_announced {
            debug!(room_id = %self.room_id, "duplicate end-of-match signal");
            return;
        }
        if let Some(winner) = self.winner {
            let local_won = self.local_seat() == Some(winner);
            info!(room_id = %self.room_id, winner = %winner, local_won, "match ended");
            self.notices.push_back(Notice::MatchEnded { winner, local_won });
            self.end_announced = true;
        }
    }

    fn vacate(&mut self, seat: Seat) {
        info!(room_id = %self.room_id, seat = %seat, "seat vacated");
        self.directory.vacate(seat);
        self.presence.seat_vacated(seat);
        self.readiness[seat.index()] = Readiness::NotReady;
    }

    fn exit(&mut self, reason: ExitReason) {
        self.placement_clock.cancel();
        self.turn_clock.cancel();
        self.discard_pending();
        self.exited = Some(reason);
    }

    fn discard_pending(&mut self) {
        match self.pending.take() {
            Some(PendingAction::Shot { target }) => self.opponent_board.rollback(target),
            Some(PendingAction::Layout) => {
                if let Some(seat) = self.local_seat() {
                    if self.readiness[seat.index()] == Readiness::Pending {
                        self.readiness[seat.index()] = Readiness::NotReady;
                    }
                }
            }
            None => {}
        }
    }

    fn ensure_phase(&self, expected: Phase) -> Result<Seat, IllegalAction> {
        if self.exited.is_some() {
            return Err(IllegalAction::LeftMatch);
        }
        if self.phase == Phase::Ended {
            return Err(IllegalAction::MatchEnded);
        }
        if self.phase != expected {
            return Err(IllegalAction::WrongPhase {
                expected,
                actual: self.phase,
            });
        }
        self.local_seat().ok_or(IllegalAction::SeatUnresolved)
    }
}

// Transport failures and server-side errors are worth another try; rejections
// and malformed bodies are not.
fn is_retryable(err: &ServiceError) -> bool {
    match err {
        ServiceError::Transport(_) => true,
        ServiceError::Upstream { status, .. } => *status >= 500,
        ServiceError::Decode(_) => false,
    }
}

async fn retry_read<T, F, Fut>(
    settings: &SessionSettings,
    operation: &'static str,
    mut call: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let attempts = settings.read_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && is_retryable(&err) => {
                warn!(operation, attempt, error = %err, "match service call failed; retrying");
                tokio::time::sleep(settings.retry_backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
