use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::API_EVENTS;

/// Domain events, serialized to the delimited text format only at the
/// publish boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    NetworkConfiguration {
        network_size: u32,
    },
    NewPlayer {
        player_id: u16,
        player_name: String,
    },
    PlayerDisconnection {
        player_id: u16,
        player_name: String,
    },
    InfectionOccurred {
        player_id: u16,
        timestamp: u64,
        start_time: u64,
        score: i64,
        code: String,
        network_size: u32,
    },
}

impl GameEvent {
    pub fn to_feed_line(&self) -> String {
        match self {
            GameEvent::NetworkConfiguration { network_size } => {
                format!("NETWORK_CONFIGURATION {network_size}")
            }
            GameEvent::NewPlayer { player_id, player_name } => {
                format!("NEW_PLAYER {player_id} {player_name}")
            }
            GameEvent::PlayerDisconnection { player_id, player_name } => {
                format!("PLAYER_DISCONNECTION {player_id} {player_name}")
            }
            GameEvent::InfectionOccurred {
                player_id,
                timestamp,
                start_time,
                score,
                code,
                network_size,
            } => {
                format!(
                    "INFECTION_OCCURRED {player_id} {timestamp} {start_time} {score} {code} {network_size}"
                )
            }
        }
    }
}

/// One-way publish channel. Sending never blocks the caller; with no
/// subscriber around the event is simply dropped.
#[derive(Clone)]
pub struct EventFeed {
    tx: broadcast::Sender<GameEvent>,
}

impl EventFeed {
    pub fn new(capacity: usize) -> EventFeed {
        let (tx, _) = broadcast::channel(capacity);
        EventFeed { tx }
    }

    pub fn publish(&self, event: GameEvent) {
        debug!(target: API_EVENTS, "publishing event: {}", event.to_feed_line());
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }
}

/// Accepts feed subscribers and fans newline-terminated event lines out to
/// them. A subscriber that falls too far behind skips events; one that goes
/// away just ends its task.
pub async fn run_feed_listener(listener: TcpListener, feed: EventFeed) -> anyhow::Result<()> {
    info!(target: API_EVENTS, "event feed is now running on {}", listener.local_addr()?);
    loop {
        let (mut socket, addr) = listener.accept().await?;
        debug!(target: API_EVENTS, "feed subscriber connected: {addr}");
        let mut rx = feed.subscribe();
        tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(target: API_EVENTS, "feed subscriber {addr} lagged, {skipped} events skipped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let line = event.to_feed_line() + "\n";
                if socket.write_all(line.as_bytes()).await.is_err() {
                    debug!(target: API_EVENTS, "feed subscriber disconnected: {addr}");
                    break;
                }
            }
        });
    }
}
