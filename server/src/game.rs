use chrono::Utc;
use log::{debug, info, warn};
use rand::Rng;
use tokio::sync::Mutex;

use crate::error::GameError;
use crate::events::{EventFeed, GameEvent};
use crate::network::{Network, Owner};
use crate::players::PlayerRegistry;
use crate::predicates::{PredicateSystem, DIFFICULTY};
use crate::GAME_EVENTS;

/// Probability that one randomization sweep resets a given node.
const AV_DETECTION_CHANCE: f64 = 0.5;

/// Everything the connection handlers share, guarded by the single world
/// lock in [`GameState`]. `last_time` advances by one per resolved
/// infection attempt and seeds event timestamps; `start_time` is fixed at
/// construction.
#[derive(Debug)]
pub struct World {
    pub network: Network,
    pub players: PlayerRegistry,
    pub start_time: u64,
    pub last_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfectionOutcome {
    /// The player already owns every node; the network was not touched.
    MaxReached { score: i64 },
    /// A node was picked and the code evaluated. The score carried here is
    /// the pre-attempt one, matching the wire contract.
    Attempted { prior_score: i64, success: bool },
}

/// The orchestrator. All mutation of the network and the registry goes
/// through these operations, each holding the world lock for its whole
/// read-modify-write sequence.
pub struct GameState {
    pub world: Mutex<World>,
    feed: EventFeed,
}

impl GameState {
    pub fn new(players: PlayerRegistry, network_size: usize, feed: EventFeed) -> GameState {
        info!(target: GAME_EVENTS, "game state is initializing...");
        let network = Network::new(network_size);
        feed.publish(GameEvent::NetworkConfiguration {
            network_size: network.size() as u32,
        });

        let start_time = Utc::now().timestamp() as u64;
        info!(target: GAME_EVENTS, "game state ready, start time is {start_time}");

        GameState {
            world: Mutex::new(World {
                network,
                players,
                start_time,
                last_time: start_time,
            }),
            feed,
        }
    }

    pub fn feed(&self) -> &EventFeed {
        &self.feed
    }

    /// Validates the player exists and is not already connected, then marks
    /// them online. Returns the network size for the announcement packet
    /// together with the player's name.
    pub async fn authenticate(&self, player_id: u16) -> Result<(u32, String), GameError> {
        let mut world = self.world.lock().await;
        if !world.players.exists(player_id) {
            return Err(GameError::UnknownPlayer(player_id));
        }
        if world.players.is_online(player_id)? {
            return Err(GameError::AlreadyConnected(player_id));
        }
        world.players.mark_online(player_id)?;
        let player_name = world.players.name(player_id)?.to_owned();
        let network_size = world.network.size() as u32;

        info!(target: GAME_EVENTS, "{player_name} (id: {player_id}) has joined the game");
        self.feed.publish(GameEvent::NewPlayer {
            player_id,
            player_name: player_name.clone(),
        });

        Ok((network_size, player_name))
    }

    /// Marks the player offline so they may reconnect. Tolerates a player
    /// that was removed while their connection was still up.
    pub async fn disconnect(&self, player_id: u16) {
        let mut world = self.world.lock().await;
        if world.players.mark_offline(player_id).is_err() {
            warn!(target: GAME_EVENTS, "disconnect for unregistered player {player_id}");
            return;
        }
        let player_name = world.players.name(player_id).map(str::to_owned).unwrap_or_default();

        info!(target: GAME_EVENTS, "{player_name} has left the game");
        self.feed.publish(GameEvent::PlayerDisconnection { player_id, player_name });
    }

    /// One infection attempt: pick a random node, evaluate the code against
    /// its predicates, transfer ownership and score on success.
    pub async fn resolve_infection(
        &self,
        player_id: u16,
        code: &str,
    ) -> Result<InfectionOutcome, GameError> {
        let mut world = self.world.lock().await;
        let current = world.players.score(player_id)?;
        let player_name = world.players.name(player_id)?.to_owned();

        if current == world.network.size() as i64 {
            info!(target: GAME_EVENTS, "{player_name} holds the whole network, nothing left to conquer");
            return Ok(InfectionOutcome::MaxReached { score: current });
        }

        debug!(target: GAME_EVENTS, "{player_name} is dispatching code {code} ({current} nodes held)");

        let (index, prior_owner, success) = {
            let (index, owner, predicates) = world.network.pick_random_node();
            (index, owner, predicates.evaluate(code))
        };
        let timestamp = world.last_time + 1;

        if success {
            world.network.set_owner(index, player_id);

            if let Owner::Player(prior) = prior_owner {
                if prior != player_id {
                    world.players.add_score(prior, -1)?;
                    debug!(target: GAME_EVENTS, "player {prior} has lost node {index} to {player_name}");
                }
            }
            if prior_owner != Owner::Player(player_id) {
                world.players.add_score(player_id, 1)?;
            }

            let score = world.players.score(player_id)?;
            if score != current {
                self.feed.publish(GameEvent::InfectionOccurred {
                    player_id,
                    timestamp,
                    start_time: world.start_time,
                    score,
                    code: code.to_owned(),
                    network_size: world.network.size() as u32,
                });
            }
        } else {
            debug!(target: GAME_EVENTS, "{player_name} failed to infect node {index} with code {code}");
        }

        world.last_time = timestamp;
        info!(
            target: GAME_EVENTS,
            "infection result for {player_name}: {}",
            if success { "SUCCESS" } else { "FAILED" }
        );
        Ok(InfectionOutcome::Attempted { prior_score: current, success })
    }

    /// Registers a new player under a random unused id.
    pub async fn add_player(&self, name: &str) -> u16 {
        let mut world = self.world.lock().await;
        world.players.add(name)
    }

    /// Removes a player and restores every node they owned to the unowned
    /// state.
    pub async fn remove_player(&self, player_id: u16) -> Result<(), GameError> {
        let mut world = self.world.lock().await;
        world.players.remove(player_id)?;
        let released = world.network.release_all(player_id);
        info!(target: GAME_EVENTS, "player {player_id} removed, {released} nodes released");
        Ok(())
    }

    /// One AV-detection sweep: each node flips a coin and, when triggered,
    /// gets a fresh predicate system and loses its owner. The displaced
    /// owner's score drops with the node so score keeps matching holdings.
    pub async fn randomize_network(&self) {
        let mut world = self.world.lock().await;
        info!(target: GAME_EVENTS, "network randomization procedure has been started");

        let mut reset_nodes = 0;
        for index in 0..world.network.size() {
            if !rand::thread_rng().gen_bool(AV_DETECTION_CHANCE) {
                continue;
            }
            if let Owner::Player(prior) = world.network.node(index).owner {
                if world.players.add_score(prior, -1).is_err() {
                    warn!(target: GAME_EVENTS, "node {index} was held by unregistered player {prior}");
                }
                info!(target: GAME_EVENTS, "AV detection on node {index} caused player {prior} to lose it");
            }
            world.network.mark_unowned(index);
            world.network.set_predicates(index, PredicateSystem::random(DIFFICULTY));
            reset_nodes += 1;
        }

        let owned = world.network.iter().filter(|(owner, _)| *owner != Owner::Unowned).count();
        info!(target: GAME_EVENTS, "network randomization has ended, {reset_nodes} nodes reset, {owned} still owned");
    }
}
