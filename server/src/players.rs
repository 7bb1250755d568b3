use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use log::{debug, info};
use rand::Rng;

use crate::error::GameError;
use crate::GAME_EVENTS;

/// Player identity, score and online status, loaded once at startup from
/// the flat `<id>:<name>` database file. Scores live only for the session.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    names: HashMap<u16, String>,
    scores: HashMap<u16, i64>,
    online: HashMap<u16, bool>,
}

impl PlayerRegistry {
    /// A missing or malformed database means the game cannot start.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<PlayerRegistry> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("player database {} is not readable, the game cannot start", path.display()))?;
        info!(target: GAME_EVENTS, "loading player database {}...", path.display());
        let registry = Self::parse(&text)
            .with_context(|| format!("player database {} is malformed", path.display()))?;
        info!(target: GAME_EVENTS, "player database loaded, {} players registered", registry.len());
        Ok(registry)
    }

    pub fn parse(text: &str) -> anyhow::Result<PlayerRegistry> {
        let mut registry = PlayerRegistry::default();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((id, name)) = line.split_once(':') else {
                bail!("line {}: expected '<id>:<name>'", i + 1);
            };
            let id: u16 = id
                .trim()
                .parse()
                .with_context(|| format!("line {}: invalid player id", i + 1))?;
            let name = name.trim();
            if name.is_empty() {
                bail!("line {}: empty player name", i + 1);
            }
            registry.insert(id, name.to_string());
            debug!(target: GAME_EVENTS, "{name} has id {id}");
        }
        Ok(registry)
    }

    fn insert(&mut self, id: u16, name: String) {
        self.names.insert(id, name);
        self.scores.insert(id, 0);
        self.online.insert(id, false);
    }

    pub fn exists(&self, player_id: u16) -> bool {
        self.names.contains_key(&player_id)
    }

    pub fn name(&self, player_id: u16) -> Result<&str, GameError> {
        self.names
            .get(&player_id)
            .map(String::as_str)
            .ok_or(GameError::UnknownPlayer(player_id))
    }

    pub fn score(&self, player_id: u16) -> Result<i64, GameError> {
        self.scores
            .get(&player_id)
            .copied()
            .ok_or(GameError::UnknownPlayer(player_id))
    }

    pub fn is_online(&self, player_id: u16) -> Result<bool, GameError> {
        self.online
            .get(&player_id)
            .copied()
            .ok_or(GameError::UnknownPlayer(player_id))
    }

    pub fn mark_online(&mut self, player_id: u16) -> Result<(), GameError> {
        let status = self
            .online
            .get_mut(&player_id)
            .ok_or(GameError::UnknownPlayer(player_id))?;
        *status = true;
        Ok(())
    }

    pub fn mark_offline(&mut self, player_id: u16) -> Result<(), GameError> {
        let status = self
            .online
            .get_mut(&player_id)
            .ok_or(GameError::UnknownPlayer(player_id))?;
        *status = false;
        Ok(())
    }

    /// Signed add, no floor or ceiling.
    pub fn add_score(&mut self, player_id: u16, delta: i64) -> Result<(), GameError> {
        let score = self
            .scores
            .get_mut(&player_id)
            .ok_or(GameError::UnknownPlayer(player_id))?;
        *score += delta;
        Ok(())
    }

    /// Registers a new player under a random unused id.
    pub fn add(&mut self, name: &str) -> u16 {
        let mut rng = rand::thread_rng();
        let mut id: u16 = rng.gen_range(1..=u16::MAX);
        while self.names.contains_key(&id) {
            id = rng.gen_range(1..=u16::MAX);
        }
        self.insert(id, name.to_string());
        info!(target: GAME_EVENTS, "player {name} (id: {id}) has been added to the system");
        id
    }

    /// Drops the player's records. Releasing the nodes they owned is the
    /// caller's job, through the network's ownership index.
    pub fn remove(&mut self, player_id: u16) -> Result<(), GameError> {
        if self.names.remove(&player_id).is_none() {
            return Err(GameError::UnknownPlayer(player_id));
        }
        self.scores.remove(&player_id);
        self.online.remove(&player_id);
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.names.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn total_score(&self) -> i64 {
        self.scores.values().sum()
    }
}
