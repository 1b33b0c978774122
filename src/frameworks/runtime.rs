// Framework bootstrap and the cooperative loop that drives one match.

use crate::domain::{Clock, MatchError, MatchService, Phase, Seat};
use crate::frameworks::config;
use crate::interface_adapters::clients::HttpMatchService;
use crate::interface_adapters::clock::SystemClock;
use crate::interface_adapters::net::{ChannelConfig, ChannelEvent, spawn_channel};
use crate::use_cases::autopilot::{default_layout, next_target};
use crate::use_cases::{MatchSession, SessionSettings};

use std::io::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let service_url = config::match_service_url();
    let timeout = config::request_timeout();
    let service = HttpMatchService::new(service_url.clone(), timeout)
        .map_err(|e| std::io::Error::other(format!("failed to initialize match client: {e}")))?;
    debug!(
        service_url = %service_url,
        request_timeout_ms = timeout.as_millis(),
        "match client configured"
    );

    let settings = SessionSettings {
        read_attempts: config::READ_ATTEMPTS,
        retry_backoff: config::RETRY_BACKOFF,
        ..SessionSettings::default()
    };
    let name = config::player_name();
    let player_id = config::player_id();
    let entered = match config::room_id() {
        Some(room_id) => {
            MatchSession::join(
                service,
                SystemClock,
                settings,
                &room_id,
                &name,
                player_id.as_deref(),
            )
            .await
        }
        None => {
            MatchSession::create(
                service,
                SystemClock,
                settings,
                &name,
                player_id.as_deref(),
                config::room_options(),
            )
            .await
        }
    };
    let mut session =
        entered.map_err(|e| std::io::Error::other(format!("failed to enter match: {e}")))?;
    info!(
        room_id = %session.room_id(),
        player_id = %session.identity(),
        "entered match"
    );

    let mut channel = spawn_channel(
        ChannelConfig {
            url: config::match_channel_url(),
            room_id: session.room_id().to_string(),
            player_id: session.identity().to_string(),
            initial_backoff: config::CHANNEL_INITIAL_BACKOFF,
            max_backoff: config::CHANNEL_MAX_BACKOFF,
        },
        config::CHANNEL_CAPACITY,
    );

    drive_session(&mut session, &mut channel.events, config::TICK_INTERVAL).await;
    channel.shutdown().await;

    match session.winner() {
        Some(winner) => info!(room_id = %session.room_id(), winner = %winner, "match finished"),
        None => info!(room_id = %session.room_id(), "left match"),
    }
    Ok(())
}

/// Runs the session until the match ends, the local seat is gone, or the
/// channel closes. Each event or tick is handled to completion before the
/// next is taken; anything arriving meanwhile waits in `events`.
pub async fn drive_session<S, C>(
    session: &mut MatchSession<S, C>,
    events: &mut mpsc::Receiver<ChannelEvent>,
    tick_interval: Duration,
) where
    S: MatchService,
    C: Clock,
{
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        autopilot_step(session).await;
        report_notices(session);
        if session.phase() == Phase::Ended || session.exit_reason().is_some() {
            return;
        }

        tokio::select! {
            event = events.recv() => match event {
                // Anything may have been missed while unsubscribed.
                Some(ChannelEvent::Connected) => log_failure(session.resync().await, "resync"),
                Some(ChannelEvent::Notification(notification)) => {
                    log_failure(session.handle_notification(notification).await, "notification");
                }
                Some(ChannelEvent::Disconnected) => {
                    warn!(room_id = %session.room_id(), "channel disconnected");
                }
                None => {
                    warn!(room_id = %session.room_id(), "channel closed");
                    return;
                }
            },
            _ = ticker.tick() => log_failure(session.tick().await, "tick"),
        }
    }
}

// Headless play: host starts a full lobby, layouts go in once, shots whenever allowed.
async fn autopilot_step<S, C>(session: &mut MatchSession<S, C>)
where
    S: MatchService,
    C: Clock,
{
    let Some(seat) = session.local_seat() else {
        return;
    };
    match session.phase() {
        Phase::Lobby => {
            if seat == Seat::First && session.occupant(seat.other()).is_some() {
                log_failure(session.start_placement().await, "start placement");
            }
        }
        Phase::Placement => {
            if session.is_ready(seat) {
                return;
            }
            let settings = session.settings();
            match default_layout(&settings.fleet, settings.grid_size) {
                Ok(ships) => log_failure(session.submit_layout(ships).await, "submit layout"),
                Err(err) => warn!(error = %err, "fleet does not fit the default layout"),
            }
        }
        Phase::Battle => {
            if !session.can_fire() {
                return;
            }
            let grid_size = session.settings().grid_size;
            if let Some(target) = next_target(session.opponent_board(), grid_size) {
                match session.fire_shot(target).await {
                    Ok(outcome) => {
                        debug!(room_id = %session.room_id(), target = %target, outcome = ?outcome, "shot resolved");
                    }
                    Err(err) => log_failure::<()>(Err(err), "fire shot"),
                }
            }
        }
        Phase::Ended => {}
    }
}

fn report_notices<S, C>(session: &mut MatchSession<S, C>)
where
    S: MatchService,
    C: Clock,
{
    let room_id = session.room_id().to_string();
    for notice in session.drain_notices() {
        info!(room_id = %room_id, notice = ?notice, "match notice");
    }
}

fn log_failure<T>(result: std::result::Result<T, MatchError>, action: &'static str) {
    match result {
        Ok(_) => {}
        Err(MatchError::StaleNotification { room_id }) => {
            debug!(room_id = %room_id, action, "dropped stale notification");
        }
        Err(MatchError::IllegalAction(reason)) => {
            debug!(action, reason = %reason, "action rejected locally");
        }
        Err(err) => warn!(action, error = %err, "match action failed"),
    }
}
