use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::bail;
use log::{debug, error, info, warn};
use protocol::{ClientPacket, ServerPacket};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::GameError;
use crate::game::{GameState, InfectionOutcome};
use crate::NETWORK_EVENTS;

/// Accepts connections forever, one handler task per client. Handler
/// failures stay inside their task and never reach this loop.
pub async fn run_server(listener: TcpListener, game: Arc<GameState>) -> anyhow::Result<()> {
    info!(target: NETWORK_EVENTS, "server is now listening on {}", listener.local_addr()?);
    loop {
        let (socket, addr) = listener.accept().await?;
        spawn_connection_process(socket, addr, Arc::clone(&game));
    }
}

struct AuthedPlayer {
    id: u16,
    name: String,
}

pub fn spawn_connection_process(mut socket: TcpStream, addr: SocketAddr, game: Arc<GameState>) {
    tokio::spawn(async move {
        debug!(target: NETWORK_EVENTS, "connection received, a new client has spawned ({addr})");
        let mut player = None;

        match run_session(&mut socket, addr, &game, &mut player).await {
            Ok(()) => debug!(target: NETWORK_EVENTS, "connection {addr} closed"),
            Err(e) => match &player {
                Some(authed) => warn!(
                    target: NETWORK_EVENTS,
                    "player {} (id: {}) seems to have crashed: {e}", authed.name, authed.id
                ),
                None => warn!(target: NETWORK_EVENTS, "client {addr} seems to have crashed: {e}"),
            },
        }

        // the sole recovery path: whatever ended the session, an
        // authenticated player goes back offline so they may reconnect
        if let Some(authed) = player {
            game.disconnect(authed.id).await;
        }
    });
}

async fn run_session(
    socket: &mut TcpStream,
    addr: SocketAddr,
    game: &GameState,
    player: &mut Option<AuthedPlayer>,
) -> anyhow::Result<()> {
    let mut static_buffer = [0u8; 1024];
    let mut input_buffer = Vec::new();

    loop {
        let len = socket.read(&mut static_buffer).await?;
        if len == 0 {
            debug!(target: NETWORK_EVENTS, "client went away: {addr}");
            return Ok(());
        }
        input_buffer.extend(&static_buffer[..len]);

        while let Some((consumed, decoded)) = ClientPacket::dequeue_and_decode(&input_buffer) {
            let packet = decoded?;
            input_buffer.drain(..consumed);

            match packet {
                ClientPacket::Auth { player_id } => {
                    if player.is_some() {
                        bail!("AUTH received on an already authenticated connection");
                    }
                    info!(target: NETWORK_EVENTS, "player with id {player_id} is trying to authenticate ({addr})");
                    match game.authenticate(player_id).await {
                        Ok((network_size, name)) => {
                            let mut output_buffer = Vec::new();
                            ServerPacket::NetworkSizeAnnouncement { network_size }.pack(&mut output_buffer);
                            socket.write_all(&output_buffer).await?;
                            info!(target: NETWORK_EVENTS, "player with id {player_id} has been authenticated as {name}");
                            *player = Some(AuthedPlayer { id: player_id, name });
                        }
                        // rejected logins get no reply, the connection just closes
                        Err(e @ GameError::UnknownPlayer(_)) => {
                            warn!(target: NETWORK_EVENTS, "{e}, closing the connection ({addr})");
                            return Ok(());
                        }
                        Err(e @ GameError::AlreadyConnected(_)) => {
                            error!(target: NETWORK_EVENTS, "{e}, refusing the login ({addr})");
                            return Ok(());
                        }
                    }
                }
                ClientPacket::Infection { code } => {
                    let Some(authed) = player.as_ref() else {
                        bail!("INFECTION received without authentication");
                    };
                    let code = protocol::code_to_string(&code);
                    debug!(target: NETWORK_EVENTS, "{} is trying to infect nodes with code {code}", authed.name);

                    let outcome = game.resolve_infection(authed.id, &code).await?;
                    let response = match outcome {
                        InfectionOutcome::MaxReached { score } => ServerPacket::MaximumInfection {
                            prior_score: score as u32,
                        },
                        InfectionOutcome::Attempted { prior_score, success } => {
                            ServerPacket::ResultInfection {
                                prior_score: prior_score as u32,
                                success,
                            }
                        }
                    };
                    let mut output_buffer = Vec::new();
                    response.pack(&mut output_buffer);
                    socket.write_all(&output_buffer).await?;
                    debug!(target: NETWORK_EVENTS, "infection result sent to {}", authed.name);
                }
                ClientPacket::Disconnection => {
                    if let Some(authed) = player.as_ref() {
                        info!(target: NETWORK_EVENTS, "{} has requested a disconnection", authed.name);
                    }
                    return Ok(());
                }
            }
        }
    }
}
