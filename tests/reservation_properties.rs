//! Property tests for the spot registry
//!
//! Random interleavings of reserve, reserve-pair and release must never let a
//! spot have two holders or an agent hold two spots.

use cubicle::office::agent::AgentId;
use cubicle::office::geometry::{Layout, Zone};
use cubicle::office::reservation::{SpotKey, SpotRegistry};
use proptest::prelude::*;
use std::collections::HashSet;

const AGENTS: [&str; 5] = ["main", "coder", "marketer", "daily", "kalshi"];
const ZONES: [Zone; 4] = [Zone::Kitchen, Zone::Lounge, Zone::Game, Zone::Meeting];

#[derive(Debug, Clone)]
enum Op {
    Reserve {
        zone: usize,
        agent: usize,
        preferred: Option<usize>,
    },
    ReservePair {
        first: usize,
        second: usize,
    },
    Release {
        agent: usize,
    },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ZONES.len(), 0..AGENTS.len(), proptest::option::of(0usize..8)).prop_map(
            |(zone, agent, preferred)| Op::Reserve {
                zone,
                agent,
                preferred
            }
        ),
        (0..AGENTS.len(), 0..AGENTS.len())
            .prop_map(|(first, second)| Op::ReservePair { first, second }),
        (0..AGENTS.len()).prop_map(|agent| Op::Release { agent }),
    ]
}

fn check_invariants(registry: &SpotRegistry) {
    let mut keys = HashSet::new();
    let mut holders = HashSet::new();
    for (key, agent) in registry.iter() {
        assert!(keys.insert(*key), "spot {key:?} granted twice");
        assert!(holders.insert(agent.clone()), "{agent} holds two spots");
        assert_eq!(registry.holder(key), Some(agent));
        assert_eq!(registry.held_by(agent), Some(*key));
    }
    assert_eq!(registry.len(), keys.len());
}

proptest! {
    #[test]
    fn prop_registry_stays_exclusive(ops in proptest::collection::vec(op(), 1..80)) {
        let layout = Layout::standard();
        let mut registry = SpotRegistry::new();
        let ids: Vec<AgentId> = AGENTS.iter().map(|a| AgentId::from(*a)).collect();

        for op in ops {
            match op {
                Op::Reserve { zone, agent, preferred } => {
                    let zone = ZONES[zone];
                    let grant = registry.reserve(zone, layout.pool(zone), &ids[agent], preferred);
                    if let Some(grant) = grant {
                        prop_assert_eq!(registry.holder(&grant.key), Some(&ids[agent]));
                        prop_assert_eq!(grant.spot, layout.pool(zone)[grant.key.slot]);
                    }
                }
                Op::ReservePair { first, second } => {
                    let pool = layout.pool(Zone::Game);
                    match registry.reserve_pair(Zone::Game, pool, &ids[first], &ids[second]) {
                        Some((a, b)) => {
                            prop_assert_eq!(a.key.slot / 2, b.key.slot / 2);
                            prop_assert_eq!(a.key.slot + 1, b.key.slot);
                            prop_assert_eq!(registry.held_by(&ids[first]), Some(a.key));
                            prop_assert_eq!(registry.held_by(&ids[second]), Some(b.key));
                        }
                        None => {
                            if first != second {
                                // A failed pair means no pair was open to these two agents.
                                let open_pair = (0..pool.len() / 2).any(|p| {
                                    let a = SpotKey::new(Zone::Game, p * 2);
                                    let b = SpotKey::new(Zone::Game, p * 2 + 1);
                                    registry.holder(&a).is_none_or(|h| *h == ids[first])
                                        && registry.holder(&b).is_none_or(|h| *h == ids[second])
                                });
                                prop_assert!(!open_pair);
                            }
                        }
                    }
                }
                Op::Release { agent } => {
                    registry.release(&ids[agent]);
                    registry.release(&ids[agent]);
                    prop_assert!(registry.held_by(&ids[agent]).is_none());
                }
            }
            check_invariants(&registry);
        }
    }
}
