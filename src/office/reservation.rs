//! Spot reservation registry
//!
//! Process-wide (per simulation) table mapping `(zone, slot)` to the agent
//! holding it. Reservation is best-effort: it never blocks, and callers fall
//! back to an unreserved point when a zone is full.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::agent::AgentId;
use super::geometry::{Point, Zone};

/// Key into the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpotKey {
    /// Zone the spot belongs to
    pub zone: Zone,
    /// Index into the zone's candidate pool
    pub slot: usize,
}

impl SpotKey {
    /// Create a new key
    pub fn new(zone: Zone, slot: usize) -> Self {
        Self { zone, slot }
    }
}

impl fmt::Display for SpotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.zone, self.slot)
    }
}

/// A granted reservation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grant {
    /// Registry key
    pub key: SpotKey,
    /// Spot position
    pub spot: Point,
}

/// Registry of exclusive amenity spots
#[derive(Debug, Clone, Default)]
pub struct SpotRegistry {
    holders: HashMap<SpotKey, AgentId>,
    held: HashMap<AgentId, SpotKey>,
}

impl SpotRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve one spot of `zone` for `agent`.
    ///
    /// The preferred slot is tried first, then the rest in pool order. The
    /// first slot that is free or already held by `agent` is granted. Any other
    /// spot the agent held is released first.
    pub fn reserve(
        &mut self,
        zone: Zone,
        candidates: &[Point],
        agent: &AgentId,
        preferred: Option<usize>,
    ) -> Option<Grant> {
        let preferred = preferred.filter(|&p| p < candidates.len());
        let order = preferred
            .into_iter()
            .chain((0..candidates.len()).filter(|&i| Some(i) != preferred));

        for slot in order {
            let key = SpotKey::new(zone, slot);
            if self.available_to(&key, agent) {
                self.claim(key, agent);
                return Some(Grant {
                    key,
                    spot: candidates[slot],
                });
            }
        }
        None
    }

    /// Reserve an adjacent pair `(2k, 2k + 1)` of `zone` for two agents at once.
    ///
    /// Both spots are granted or neither is.
    pub fn reserve_pair(
        &mut self,
        zone: Zone,
        candidates: &[Point],
        first: &AgentId,
        second: &AgentId,
    ) -> Option<(Grant, Grant)> {
        if first == second {
            return None;
        }
        for pair in 0..candidates.len() / 2 {
            let a = SpotKey::new(zone, pair * 2);
            let b = SpotKey::new(zone, pair * 2 + 1);
            if self.available_to(&a, first) && self.available_to(&b, second) {
                self.claim(a, first);
                self.claim(b, second);
                return Some((
                    Grant {
                        key: a,
                        spot: candidates[a.slot],
                    },
                    Grant {
                        key: b,
                        spot: candidates[b.slot],
                    },
                ));
            }
        }
        None
    }

    /// Release whatever `agent` holds. Idempotent.
    pub fn release(&mut self, agent: &AgentId) -> Option<SpotKey> {
        let key = self.held.remove(agent)?;
        self.holders.remove(&key);
        Some(key)
    }

    /// Current holder of a spot
    pub fn holder(&self, key: &SpotKey) -> Option<&AgentId> {
        self.holders.get(key)
    }

    /// Spot currently held by an agent
    pub fn held_by(&self, agent: &AgentId) -> Option<SpotKey> {
        self.held.get(agent).copied()
    }

    /// Number of held spots
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Whether nothing is held
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Iterate over `(key, holder)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&SpotKey, &AgentId)> {
        self.holders.iter()
    }

    fn available_to(&self, key: &SpotKey, agent: &AgentId) -> bool {
        match self.holders.get(key) {
            None => true,
            Some(holder) => holder == agent,
        }
    }

    fn claim(&mut self, key: SpotKey, agent: &AgentId) {
        if let Some(previous) = self.held.get(agent).copied() {
            if previous == key {
                return;
            }
            self.holders.remove(&previous);
        }
        self.holders.insert(key, agent.clone());
        self.held.insert(agent.clone(), key);
    }
}
