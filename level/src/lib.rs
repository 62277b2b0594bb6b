#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state management for Cavern Crawl.
//!
//! A [`Level`] owns the generated tile grid and the creatures moving through
//! it. Adapters mutate it exclusively through [`apply`], which runs the
//! generation pipeline for `LoadLevel` commands (noise, smoothing,
//! connectivity repair, decoration) and integrates creature movement with
//! axis-separated collision checks for `Tick` commands. Read access goes
//! through the [`query`] module.

mod connectivity;
mod decoration;
mod generator;
mod rng;

use std::collections::BTreeMap;
use std::time::Duration;

use cavern_crawl_core::{
    Command, CreatureId, Event, GenerationError, LevelConfig, TerrainView, TileCoord, TileKind,
    Velocity, WorldPos,
};

use crate::generator::CaveTuning;

/// Authoritative level state mutated exclusively through [`apply`].
#[derive(Debug)]
pub struct Level {
    tiles: TileMap,
    seed: u32,
    creatures: BTreeMap<CreatureId, CreatureState>,
    next_creature_id: CreatureId,
    ticks: u64,
}

impl Level {
    /// Creates an empty level with no grid and no creatures.
    ///
    /// Every query against the empty level reports blocked terrain; a
    /// `LoadLevel` command installs the first usable grid.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tiles: TileMap::empty(),
            seed: 0,
            creatures: BTreeMap::new(),
            next_creature_id: CreatureId::new(0),
            ticks: 0,
        }
    }

    fn advance(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.ticks = self.ticks.saturating_add(1);
        let dt_seconds = dt.as_secs_f32();
        let view = self.tiles.view();
        for (id, state) in &mut self.creatures {
            let from = state.position;
            let to = step_position(view, from, state.velocity, state.radius, dt_seconds);
            if to != from {
                state.position = to;
                out_events.push(Event::CreatureMoved {
                    creature: *id,
                    from,
                    to,
                });
            }
        }
        out_events.push(Event::TimeAdvanced { dt });
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the level, mutating state deterministically.
pub fn apply(level: &mut Level, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadLevel { config } => match build_tiles(&config) {
            Ok(tiles) => {
                level.tiles = tiles;
                level.seed = config.seed();
                level.creatures.clear();
                level.next_creature_id = CreatureId::new(0);
                out_events.push(Event::LevelBuilt {
                    columns: level.tiles.columns(),
                    rows: level.tiles.rows(),
                    seed: config.seed(),
                });
            }
            Err(reason) => out_events.push(Event::LevelRejected { reason }),
        },
        Command::SpawnCreature {
            position,
            radius,
            speed,
        } => {
            if level.tiles.view().can_occupy(position, radius) {
                let creature = level.next_creature_id;
                level.next_creature_id = CreatureId::new(creature.get().wrapping_add(1));
                let _ = level.creatures.insert(
                    creature,
                    CreatureState {
                        position,
                        velocity: Velocity::ZERO,
                        radius,
                        speed,
                    },
                );
                out_events.push(Event::CreatureSpawned {
                    creature,
                    position,
                    speed,
                });
            } else {
                out_events.push(Event::SpawnRejected { position });
            }
        }
        Command::SteerCreature { creature, velocity } => {
            // Unknown identifiers are stale commands from a previous level.
            if let Some(state) = level.creatures.get_mut(&creature) {
                state.velocity = velocity;
            }
        }
        Command::Tick { dt } => level.advance(dt, out_events),
    }
}

/// Runs the full generation pipeline for the provided configuration.
fn build_tiles(config: &LevelConfig) -> Result<TileMap, GenerationError> {
    let mut tiles = TileMap::new(config.columns(), config.rows())?;
    let base_seed = u64::from(config.seed());
    generator::generate(&mut tiles, base_seed, &CaveTuning::default());
    let spawn = tiles.center();
    connectivity::repair(&mut tiles, spawn)?;
    decoration::decorate(&mut tiles, base_seed, config.water_chance());
    Ok(tiles)
}

/// Advances one tick of movement for a single creature.
///
/// Each axis is tested independently: the horizontal displacement is kept
/// only if the resulting position is occupiable at the current vertical
/// coordinate, then the vertical displacement is tested at the already
/// updated horizontal coordinate. A rejected axis leaves that axis
/// unchanged, which lets movers slide along walls.
fn step_position(
    view: TerrainView<'_>,
    from: WorldPos,
    velocity: Velocity,
    radius: f32,
    dt_seconds: f32,
) -> WorldPos {
    let mut position = from;
    let horizontal = position.offset(velocity.x() * dt_seconds, 0.0);
    if view.can_occupy(horizontal, radius) {
        position = horizontal;
    }
    let vertical = position.offset(0.0, velocity.y() * dt_seconds);
    if view.can_occupy(vertical, radius) {
        position = vertical;
    }
    position
}

/// Mutable state tracked for a single creature.
#[derive(Clone, Copy, Debug)]
struct CreatureState {
    position: WorldPos,
    velocity: Velocity,
    radius: f32,
    speed: f32,
}

/// Dense row-major storage for the level's tile grid.
#[derive(Clone, Debug)]
pub(crate) struct TileMap {
    columns: u32,
    rows: u32,
    kinds: Vec<TileKind>,
}

impl TileMap {
    /// Creates the zero-sized grid used before the first `LoadLevel`.
    pub(crate) const fn empty() -> Self {
        Self {
            columns: 0,
            rows: 0,
            kinds: Vec::new(),
        }
    }

    /// Allocates an all-wall grid, surfacing allocation failure explicitly.
    pub(crate) fn new(columns: u32, rows: u32) -> Result<Self, GenerationError> {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows))
            .map_err(|_| GenerationError::OutOfMemory)?;
        let mut kinds = Vec::new();
        kinds
            .try_reserve_exact(capacity)
            .map_err(|_| GenerationError::OutOfMemory)?;
        kinds.resize(capacity, TileKind::Wall);
        Ok(Self {
            columns,
            rows,
            kinds,
        })
    }

    pub(crate) const fn columns(&self) -> u32 {
        self.columns
    }

    pub(crate) const fn rows(&self) -> u32 {
        self.rows
    }

    /// Grid center; the generation pipeline spawns and floods from here.
    pub(crate) const fn center(&self) -> TileCoord {
        TileCoord::new(self.columns / 2, self.rows / 2)
    }

    pub(crate) fn kind(&self, tile: TileCoord) -> Option<TileKind> {
        self.index(tile)
            .and_then(|index| self.kinds.get(index))
            .copied()
    }

    /// Writes a tile kind; out-of-bounds coordinates are ignored.
    pub(crate) fn set_kind(&mut self, tile: TileCoord, kind: TileKind) {
        if let Some(slot) = self
            .index(tile)
            .and_then(|index| self.kinds.get_mut(index))
        {
            *slot = kind;
        }
    }

    pub(crate) fn view(&self) -> TerrainView<'_> {
        TerrainView::new(&self.kinds, self.columns, self.rows)
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.column() < self.columns && tile.row() < self.rows {
            let row = usize::try_from(tile.row()).ok()?;
            let column = usize::try_from(tile.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Query functions that provide read-only access to the level state.
pub mod query {
    use super::Level;
    use cavern_crawl_core::{CreatureSnapshot, CreatureView, TerrainView, WorldPos};

    /// Captures a read-only view of the level's terrain.
    #[must_use]
    pub fn terrain(level: &Level) -> TerrainView<'_> {
        level.tiles.view()
    }

    /// Reports whether a footprint of the provided radius may occupy the
    /// provided world position.
    #[must_use]
    pub fn can_occupy(level: &Level, center: WorldPos, radius: f32) -> bool {
        level.tiles.view().can_occupy(center, radius)
    }

    /// Captures a read-only view of the creatures in ascending id order.
    #[must_use]
    pub fn creatures(level: &Level) -> CreatureView {
        let snapshots: Vec<CreatureSnapshot> = level
            .creatures
            .iter()
            .map(|(id, state)| CreatureSnapshot {
                id: *id,
                position: state.position,
                velocity: state.velocity,
                radius: state.radius,
                speed: state.speed,
            })
            .collect();
        CreatureView::from_snapshots(snapshots)
    }

    /// Number of creatures currently inhabiting the level.
    #[must_use]
    pub fn creature_count(level: &Level) -> usize {
        level.creatures.len()
    }

    /// Number of ticks the level has processed.
    #[must_use]
    pub fn tick_count(level: &Level) -> u64 {
        level.ticks
    }

    /// Master seed of the currently installed grid.
    #[must_use]
    pub fn level_seed(level: &Level) -> u32 {
        level.seed
    }
}

#[cfg(test)]
mod tests {
    use super::{apply, query, Level};
    use cavern_crawl_core::{
        Command, CreatureId, Event, GenerationError, LevelConfig, TileKind, Velocity, WorldPos,
    };
    use std::time::Duration;

    const TEST_CONFIG: LevelConfig = LevelConfig::new(77, 24, 18, 1, 0.0);

    #[test]
    fn load_level_installs_grid_and_reports_dimensions() {
        let mut level = Level::new();
        let mut events = Vec::new();

        apply(&mut level, Command::LoadLevel { config: TEST_CONFIG }, &mut events);

        assert_eq!(
            events,
            vec![Event::LevelBuilt {
                columns: 24,
                rows: 18,
                seed: 77,
            }]
        );
        let view = query::terrain(&level);
        assert_eq!(view.dimensions(), (24, 18));
        assert_eq!(query::level_seed(&level), 77);
    }

    #[test]
    fn empty_level_blocks_every_query() {
        let level = Level::new();
        assert!(!query::can_occupy(&level, WorldPos::new(16.0, 16.0), 1.0));
        assert_eq!(query::terrain(&level).dimensions(), (0, 0));
    }

    #[test]
    fn oversized_grid_is_rejected_with_out_of_memory() {
        let mut level = Level::new();
        let mut events = Vec::new();
        let config = LevelConfig::new(1, u32::MAX, u32::MAX, 1, 0.0);

        apply(&mut level, Command::LoadLevel { config }, &mut events);

        assert_eq!(
            events,
            vec![Event::LevelRejected {
                reason: GenerationError::OutOfMemory,
            }]
        );
        // The failed load must not clobber the previous (empty) grid.
        assert_eq!(query::terrain(&level).dimensions(), (0, 0));
    }

    #[test]
    fn creatures_spawn_only_on_occupiable_positions() {
        let mut level = Level::new();
        let mut events = Vec::new();
        apply(&mut level, Command::LoadLevel { config: TEST_CONFIG }, &mut events);

        let view = query::terrain(&level);
        let spawn = view.tile_center(view.center());
        events.clear();
        apply(
            &mut level,
            Command::SpawnCreature {
                position: spawn,
                radius: 10.0,
                speed: 150.0,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::CreatureSpawned {
                creature: CreatureId::new(0),
                position: spawn,
                speed: 150.0,
            }]
        );

        // Tile (0, 0) is border wall on every generated grid.
        let blocked = WorldPos::new(16.0, 16.0);
        events.clear();
        apply(
            &mut level,
            Command::SpawnCreature {
                position: blocked,
                radius: 10.0,
                speed: 150.0,
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::SpawnRejected { position: blocked }]);
        assert_eq!(query::creature_count(&level), 1);
    }

    #[test]
    fn steered_creatures_move_during_ticks() {
        let mut level = Level::new();
        let mut events = Vec::new();
        apply(&mut level, Command::LoadLevel { config: TEST_CONFIG }, &mut events);

        let view = query::terrain(&level);
        let spawn = view.tile_center(view.center());
        apply(
            &mut level,
            Command::SpawnCreature {
                position: spawn,
                radius: 10.0,
                speed: 150.0,
            },
            &mut events,
        );
        apply(
            &mut level,
            Command::SteerCreature {
                creature: CreatureId::new(0),
                velocity: Velocity::new(32.0, 0.0),
            },
            &mut events,
        );

        events.clear();
        apply(
            &mut level,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );

        let moved = spawn.offset(32.0, 0.0);
        assert_eq!(
            events,
            vec![
                Event::CreatureMoved {
                    creature: CreatureId::new(0),
                    from: spawn,
                    to: moved,
                },
                Event::TimeAdvanced {
                    dt: Duration::from_secs(1),
                },
            ]
        );
        let snapshot = query::creatures(&level)
            .into_vec()
            .into_iter()
            .next()
            .expect("one creature");
        assert_eq!(snapshot.position, moved);
        assert_eq!(query::tick_count(&level), 1);
    }

    #[test]
    fn steering_an_unknown_creature_is_ignored() {
        let mut level = Level::new();
        let mut events = Vec::new();
        apply(
            &mut level,
            Command::SteerCreature {
                creature: CreatureId::new(9),
                velocity: Velocity::new(1.0, 1.0),
            },
            &mut events,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn loading_a_level_discards_existing_creatures() {
        let mut level = Level::new();
        let mut events = Vec::new();
        apply(&mut level, Command::LoadLevel { config: TEST_CONFIG }, &mut events);
        let view = query::terrain(&level);
        let spawn = view.tile_center(view.center());
        apply(
            &mut level,
            Command::SpawnCreature {
                position: spawn,
                radius: 10.0,
                speed: 150.0,
            },
            &mut events,
        );
        assert_eq!(query::creature_count(&level), 1);

        apply(&mut level, Command::LoadLevel { config: TEST_CONFIG }, &mut events);
        assert_eq!(query::creature_count(&level), 0);

        // Identifier allocation restarts for the fresh level.
        events.clear();
        apply(
            &mut level,
            Command::SpawnCreature {
                position: spawn,
                radius: 10.0,
                speed: 150.0,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::CreatureSpawned {
                creature: CreatureId::new(0),
                position: spawn,
                speed: 150.0,
            }]
        );
    }

    #[test]
    fn identical_configs_build_identical_grids() {
        let mut first = Level::new();
        let mut second = Level::new();
        let mut events = Vec::new();
        let config = LevelConfig::new(4242, 40, 30, 1, 0.2);

        apply(&mut first, Command::LoadLevel { config }, &mut events);
        apply(&mut second, Command::LoadLevel { config }, &mut events);

        let first_tiles: Vec<TileKind> = query::terrain(&first).iter().collect();
        let second_tiles: Vec<TileKind> = query::terrain(&second).iter().collect();
        assert_eq!(first_tiles, second_tiles);
    }
}
