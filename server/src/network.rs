use std::collections::{BTreeSet, HashMap};

use rand::Rng;

use crate::predicates::{PredicateSystem, DIFFICULTY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Unowned,
    Player(u16),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub owner: Owner,
    pub predicates: PredicateSystem,
}

/// The shared network of infectable nodes. The `owned_by` index mirrors the
/// per-node owner markers so a player's holdings can be released without a
/// full scan; it is maintained on every ownership change.
#[derive(Debug)]
pub struct Network {
    nodes: Vec<Node>,
    owned_by: HashMap<u16, BTreeSet<usize>>,
}

impl Network {
    pub fn new(size: usize) -> Network {
        let mut network = Network {
            nodes: Vec::new(),
            owned_by: HashMap::new(),
        };
        network.reset(size);
        network
    }

    /// Reinitializes every node to unowned with a fresh random predicate
    /// system.
    pub fn reset(&mut self, size: usize) {
        self.nodes = (0..size)
            .map(|_| Node {
                owner: Owner::Unowned,
                predicates: PredicateSystem::random(DIFFICULTY),
            })
            .collect();
        self.owned_by.clear();
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Uniform selection, independent of current ownership.
    pub fn pick_random_node(&self) -> (usize, Owner, &PredicateSystem) {
        let index = rand::thread_rng().gen_range(0..self.nodes.len());
        let node = &self.nodes[index];
        (index, node.owner, &node.predicates)
    }

    pub fn set_owner(&mut self, index: usize, player_id: u16) {
        self.detach(index);
        self.nodes[index].owner = Owner::Player(player_id);
        self.owned_by.entry(player_id).or_default().insert(index);
    }

    pub fn mark_unowned(&mut self, index: usize) {
        self.detach(index);
        self.nodes[index].owner = Owner::Unowned;
    }

    fn detach(&mut self, index: usize) {
        if let Owner::Player(prior) = self.nodes[index].owner {
            if let Some(positions) = self.owned_by.get_mut(&prior) {
                positions.remove(&index);
                if positions.is_empty() {
                    self.owned_by.remove(&prior);
                }
            }
        }
    }

    /// Releases every node the player owns, returning how many there were.
    pub fn release_all(&mut self, player_id: u16) -> usize {
        let Some(positions) = self.owned_by.remove(&player_id) else {
            return 0;
        };
        let released = positions.len();
        for index in positions {
            self.nodes[index].owner = Owner::Unowned;
        }
        released
    }

    pub fn owned_count(&self, player_id: u16) -> usize {
        self.owned_by.get(&player_id).map_or(0, BTreeSet::len)
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn set_predicates(&mut self, index: usize, predicates: PredicateSystem) {
        self.nodes[index].predicates = predicates;
    }

    /// Restartable walk over the nodes, maintenance and observability only.
    /// The caller is expected to hold the world lock.
    pub fn iter(&self) -> impl Iterator<Item = (Owner, &PredicateSystem)> {
        self.nodes.iter().map(|node| (node.owner, &node.predicates))
    }
}
