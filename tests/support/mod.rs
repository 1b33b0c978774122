#![allow(dead_code)]

// Shared integration-test harness.
//
// `authority` is an in-memory match service that enforces the match rules the
// real service would (seat binding, phase changes, turn order, hit detection)
// and records every push per seat. `server` wraps it in the same REST routes
// and WebSocket channel the client adapters speak, bound to an ephemeral port
// per test so tests never share state.

pub mod authority;
pub mod server;

pub use authority::{InMemoryService, TestClock};
pub use server::spawn_server;

use match_client::domain::{
    Coordinate, Fleet, GRID_SIZE, Orientation, PlacedShip, Seat, ShipLayout,
};
use match_client::use_cases::{MatchSession, SessionSettings};
use std::time::Duration;

pub const T0: u64 = 1_700_000_000_000;

/// Ship `i` lies horizontally on row `2 * i`, starting at `column`.
pub fn layout_at_column(column: u8) -> Vec<PlacedShip> {
    let mut layout = ShipLayout::new(Fleet::classic(), GRID_SIZE);
    for slot in 0..layout.fleet().len() {
        let row = u8::try_from(slot * 2).expect("row fits in u8");
        layout
            .place(slot, Coordinate::new(row, column), Orientation::Horizontal)
            .expect("ship fits");
    }
    layout.into_ships()
}

/// Fast retries so failure paths do not slow the suite down.
pub fn settings() -> SessionSettings {
    SessionSettings {
        retry_backoff: Duration::from_millis(10),
        ..SessionSettings::default()
    }
}

/// Delivers everything queued for the session's seat, in order.
pub async fn pump(session: &mut MatchSession<InMemoryService, TestClock>, service: &InMemoryService) {
    let seat: Seat = session.local_seat().expect("session holds a seat");
    for notification in service.drain(session.room_id(), seat) {
        session
            .handle_notification(notification)
            .await
            .expect("notification applies");
    }
}
