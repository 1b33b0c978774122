use std::{env, time::Duration};

use crate::domain::{RoomOptions, Seat};

// Runtime/client constants (not game rules).

pub fn match_service_url() -> String {
    env::var("MATCH_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:4000".to_string())
}

pub fn match_channel_url() -> String {
    env::var("MATCH_CHANNEL_URL").unwrap_or_else(|_| "ws://127.0.0.1:4000/battleship".to_string())
}

pub fn request_timeout() -> Duration {
    let millis = env::var("MATCH_REQUEST_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(5000);
    Duration::from_millis(millis)
}

pub fn player_name() -> String {
    env::var("MATCH_PLAYER_NAME")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "Pilot".to_string())
}

pub fn player_id() -> Option<String> {
    env::var("MATCH_PLAYER_ID")
        .ok()
        .filter(|value| !value.is_empty())
}

// Join this room when set; otherwise create a new one.
pub fn room_id() -> Option<String> {
    env::var("MATCH_ROOM_ID").ok().filter(|value| !value.is_empty())
}

pub fn room_options() -> RoomOptions {
    let defaults = RoomOptions::default();
    let seconds = |key: &str, fallback: Duration| {
        env::var(key)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(fallback)
    };
    let first_turn = match env::var("MATCH_FIRST_TURN").as_deref() {
        Ok("second") => Seat::Second,
        _ => Seat::First,
    };
    RoomOptions {
        turn_duration: seconds("MATCH_TURN_SECONDS", defaults.turn_duration),
        placement_duration: seconds("MATCH_PLACEMENT_SECONDS", defaults.placement_duration),
        first_turn,
    }
}

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const CHANNEL_CAPACITY: usize = 256;

pub const READ_ATTEMPTS: u32 = 3;
pub const RETRY_BACKOFF: Duration = Duration::from_millis(250);

pub const CHANNEL_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const CHANNEL_MAX_BACKOFF: Duration = Duration::from_secs(10);
