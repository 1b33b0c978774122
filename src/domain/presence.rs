// Per-seat connectivity derived from channel push notifications.

use super::room::Seat;

/// A connectivity push. `seat` is absent when the channel only says "your peer".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSignal {
    pub seat: Option<Seat>,
    pub connected: bool,
}

/// A connectivity flip the caller should surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChange {
    pub seat: Seat,
    pub connected: bool,
}

/// Pure reducer over presence signals. Signals that name a seat not yet known
/// locally are held until the seat is bound.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    local: Option<Seat>,
    known: [bool; 2],
    connected: [bool; 2],
    // At most one entry per target; the latest signal wins.
    buffered: Vec<PresenceSignal>,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self {
            local: None,
            known: [false; 2],
            connected: [true; 2],
            buffered: Vec::new(),
        }
    }
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown seats report as connected; nothing has said otherwise.
    pub fn is_connected(&self, seat: Seat) -> bool {
        self.connected[seat.index()]
    }

    pub fn buffered(&self) -> usize {
        self.buffered.len()
    }

    /// Records which seat the local identity holds and replays held signals.
    pub fn bind_local(&mut self, seat: Seat) -> Vec<PresenceChange> {
        self.local = Some(seat);
        self.known[seat.index()] = true;
        self.replay()
    }

    /// Marks a seat as occupied. The first time a seat becomes known its
    /// connectivity is seeded from the service snapshot.
    pub fn seat_bound(&mut self, seat: Seat, connected: bool) -> Vec<PresenceChange> {
        if !self.known[seat.index()] {
            self.known[seat.index()] = true;
            self.connected[seat.index()] = connected;
        }
        self.replay()
    }

    /// Forgets a seat whose occupant left or was removed.
    pub fn seat_vacated(&mut self, seat: Seat) {
        self.known[seat.index()] = false;
        self.connected[seat.index()] = true;
    }

    /// Applies a signal, or holds it until its seat is known.
    pub fn apply(&mut self, signal: PresenceSignal) -> Option<PresenceChange> {
        match self.resolve(signal) {
            Some(seat) => self.set(seat, signal.connected),
            None => {
                self.buffered.retain(|held| held.seat != signal.seat);
                self.buffered.push(signal);
                None
            }
        }
    }

    fn resolve(&self, signal: PresenceSignal) -> Option<Seat> {
        let seat = signal.seat.or_else(|| self.local.map(Seat::other))?;
        self.known[seat.index()].then_some(seat)
    }

    fn set(&mut self, seat: Seat, connected: bool) -> Option<PresenceChange> {
        let slot = &mut self.connected[seat.index()];
        if *slot == connected {
            return None;
        }
        *slot = connected;
        Some(PresenceChange { seat, connected })
    }

    fn replay(&mut self) -> Vec<PresenceChange> {
        let held = std::mem::take(&mut self.buffered);
        let mut changes = Vec::new();
        for signal in held {
            match self.resolve(signal) {
                Some(seat) => changes.extend(self.set(seat, signal.connected)),
                None => self.buffered.push(signal),
            }
        }
        changes
    }
}
