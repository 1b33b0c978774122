// WebSocket push channel: subscribes to one room and forwards decoded
// notifications to the session loop.

use crate::interface_adapters::protocol::{ChannelRequest, decode_notification};
use crate::use_cases::Notification;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Events the channel task hands to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A connection is up and the subscription was sent.
    Connected,
    Notification(Notification),
    /// The connection dropped; a reconnect is scheduled.
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub room_id: String,
    pub player_id: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

/// Handle to a spawned channel task.
pub struct ChannelHandle {
    pub events: mpsc::Receiver<ChannelEvent>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Signals the task to close its socket and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "channel task ended abnormally");
        }
    }
}

pub fn spawn_channel(config: ChannelConfig, capacity: usize) -> ChannelHandle {
    let (events_tx, events) = mpsc::channel(capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_channel(config, events_tx, shutdown_rx));
    ChannelHandle {
        events,
        shutdown_tx,
        task,
    }
}

/// Connects, subscribes, and forwards frames until shutdown or until the
/// receiving side goes away. Reconnects with exponential backoff.
pub async fn run_channel(
    config: ChannelConfig,
    events: mpsc::Sender<ChannelEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = config.initial_backoff;

    loop {
        if *shutdown.borrow() {
            return;
        }

        match tokio_tungstenite::connect_async(config.url.as_str()).await {
            Ok((socket, _response)) => {
                info!(url = %config.url, room_id = %config.room_id, "channel connected");
                backoff = config.initial_backoff;
                let (mut write, mut read) = socket.split();

                let subscribe = ChannelRequest::Subscribe {
                    room_id: config.room_id.clone(),
                    player_id: config.player_id.clone(),
                };
                let payload = match serde_json::to_string(&subscribe) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(error = %err, "failed to encode subscribe frame");
                        return;
                    }
                };
                if let Err(err) = write.send(Message::text(payload)).await {
                    warn!(error = %err, "failed to subscribe");
                } else {
                    if events.send(ChannelEvent::Connected).await.is_err() {
                        return;
                    }

                    loop {
                        tokio::select! {
                            _ = shutdown.changed() => {
                                let _ = write.send(Message::Close(None)).await;
                                return;
                            }
                            frame = read.next() => match frame {
                                Some(Ok(Message::Text(text))) => {
                                    match decode_notification(text.as_str()) {
                                        Ok(notification) => {
                                            if events
                                                .send(ChannelEvent::Notification(notification))
                                                .await
                                                .is_err()
                                            {
                                                return;
                                            }
                                        }
                                        Err(err) => {
                                            warn!(error = %err, frame = %text.as_str(), "dropping undecodable frame");
                                        }
                                    }
                                }
                                Some(Ok(Message::Close(frame))) => {
                                    debug!(?frame, "channel closed by peer");
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(err)) => {
                                    warn!(error = %err, "channel read failed");
                                    break;
                                }
                                None => break,
                            }
                        }
                    }
                }

                if events.send(ChannelEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(url = %config.url, error = %err, "channel connect failed");
            }
        }

        debug!(delay_ms = backoff.as_millis(), "reconnecting channel");
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = shutdown.changed() => return,
        }
        backoff = (backoff * 2).min(config.max_backoff);
    }
}
