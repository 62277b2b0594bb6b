#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wander system that proposes creature steering.
//!
//! The system watches level events and, for every advanced tick, draws a
//! fresh cardinal-or-idle direction per creature from that creature's own
//! seeded stream. Streams are derived from the level seed and the creature
//! identifier, so one creature's draws never depend on how many other
//! creatures exist or when they joined.

use std::collections::BTreeMap;

use cavern_crawl_core::{Command, CreatureId, Event, Velocity, RNG_STREAM_CREATURE_PREFIX};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Pure system that reacts to level events and emits steering commands.
#[derive(Debug, Default)]
pub struct Wander {
    level_seed: u64,
    creatures: BTreeMap<CreatureId, CreatureStream>,
}

impl Wander {
    /// Consumes level events and emits a steering command per creature for
    /// every advanced tick.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::LevelBuilt { seed, .. } => {
                    self.level_seed = u64::from(*seed);
                    self.creatures.clear();
                }
                Event::CreatureSpawned {
                    creature, speed, ..
                } => {
                    let seed = derive_creature_seed(self.level_seed, *creature);
                    let _ = self.creatures.insert(
                        *creature,
                        CreatureStream {
                            stream: ChaCha8Rng::seed_from_u64(seed),
                            speed: *speed,
                        },
                    );
                }
                Event::TimeAdvanced { .. } => self.steer_all(out),
                Event::LevelRejected { .. }
                | Event::SpawnRejected { .. }
                | Event::CreatureMoved { .. } => {}
            }
        }
    }

    fn steer_all(&mut self, out: &mut Vec<Command>) {
        for (creature, entry) in &mut self.creatures {
            let dx = entry.stream.gen_range(-1_i32..=1);
            let dy = entry.stream.gen_range(-1_i32..=1);
            out.push(Command::SteerCreature {
                creature: *creature,
                velocity: Velocity::new(dx as f32 * entry.speed, dy as f32 * entry.speed),
            });
        }
    }
}

#[derive(Debug)]
struct CreatureStream {
    stream: ChaCha8Rng,
    speed: f32,
}

fn derive_creature_seed(level_seed: u64, creature: CreatureId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(level_seed.to_le_bytes());
    hasher.update(RNG_STREAM_CREATURE_PREFIX.as_bytes());
    hasher.update(creature.get().to_le_bytes());
    let digest = hasher.finalize();
    let bytes: [u8; 8] = digest[0..8].try_into().expect("sha256 digest slice length");
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::derive_creature_seed;
    use cavern_crawl_core::CreatureId;

    #[test]
    fn creature_seeds_differ_per_identifier() {
        assert_ne!(
            derive_creature_seed(9, CreatureId::new(0)),
            derive_creature_seed(9, CreatureId::new(1))
        );
    }

    #[test]
    fn creature_seeds_differ_per_level_seed() {
        assert_ne!(
            derive_creature_seed(9, CreatureId::new(0)),
            derive_creature_seed(10, CreatureId::new(0))
        );
    }
}
