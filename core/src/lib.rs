#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared contracts for the Cavern Crawl engine.
//!
//! Everything that crosses a crate boundary lives here: the [`Command`]
//! values adapters submit, the [`Event`] values the level broadcasts after
//! executing them, and the read-only views used to inspect state. Systems
//! never touch the level directly; they consume event streams and answer
//! with fresh command batches, which keeps a whole run reproducible from
//! its command log alone.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side length of a single square tile measured in world units.
pub const TILE_LENGTH: f32 = 32.0;

/// Collision footprint radius assigned to creatures spawned by the adapter.
pub const DEFAULT_CREATURE_RADIUS: f32 = 10.0;

/// Walking speed assigned to wandering creatures, in world units per second.
pub const DEFAULT_CREATURE_SPEED: f32 = 150.0;

/// Stream label for the terrain draws performed by the generator.
pub const RNG_STREAM_TERRAIN: &str = "terrain";

/// Stream label for the decoration pass draws.
pub const RNG_STREAM_DECORATION: &str = "decoration";

/// Stream label prefix for per-creature wander draws.
pub const RNG_STREAM_CREATURE_PREFIX: &str = "creature";

/// Commands that express all permissible level mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the level contents by running the full generation pipeline.
    LoadLevel {
        /// Configuration record consumed once by the generator.
        config: LevelConfig,
    },
    /// Requests that a creature be admitted into the level.
    SpawnCreature {
        /// World position the creature should occupy after spawning.
        position: WorldPos,
        /// Collision footprint radius of the creature in world units.
        radius: f32,
        /// Walking speed of the creature in world units per second.
        speed: f32,
    },
    /// Updates the velocity a creature applies on subsequent ticks.
    SteerCreature {
        /// Identifier of the creature being steered.
        creature: CreatureId,
        /// Velocity to apply, expressed in world units per second.
        velocity: Velocity,
    },
    /// Moves simulated time forward by `dt`.
    Tick {
        /// Simulated time covered by this tick.
        dt: Duration,
    },
}

/// Events broadcast by the level after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the generation pipeline produced a traversable grid.
    LevelBuilt {
        /// Number of tile columns in the generated grid.
        columns: u32,
        /// Number of tile rows in the generated grid.
        rows: u32,
        /// Master seed the pipeline was run with.
        seed: u32,
    },
    /// Reports that the generation pipeline failed and no grid was installed.
    LevelRejected {
        /// Specific reason generation failed.
        reason: GenerationError,
    },
    /// Confirms that a creature was admitted into the level.
    CreatureSpawned {
        /// Identifier assigned to the creature by the level.
        creature: CreatureId,
        /// World position the creature occupies after spawning.
        position: WorldPos,
        /// Walking speed of the creature in world units per second.
        speed: f32,
    },
    /// Reports that a spawn request targeted an unoccupiable position.
    SpawnRejected {
        /// World position provided in the rejected request.
        position: WorldPos,
    },
    /// Confirms that a creature changed position during a tick.
    CreatureMoved {
        /// Identifier of the creature that moved.
        creature: CreatureId,
        /// Position the creature occupied before the tick.
        from: WorldPos,
        /// Position the creature occupies after the tick.
        to: WorldPos,
    },
    /// Reports that simulated time moved forward.
    TimeAdvanced {
        /// Simulated time covered by the tick.
        dt: Duration,
    },
}

/// Classification assigned to every tile in the grid.
///
/// A tile carries exactly one kind; traversal and visibility are derived
/// from it rather than stored alongside it, so the two can never disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Solid rock. Blocks movement and sight.
    Wall,
    /// Open cavern floor.
    Floor,
    /// Carved opening. Reserved; the generation pipeline never emits it.
    Door,
    /// Decorative water. Visible across, but blocks movement.
    Water,
}

impl TileKind {
    /// Reports whether an entity's collision footprint may occupy the tile.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Floor | Self::Door)
    }

    /// Reports whether sight lines pass through the tile.
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// Unique identifier assigned to a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatureId(u32);

impl CreatureId {
    /// Creates a new creature identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Unwraps the identifier into its raw numeric value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Computes the Chebyshev distance between two tile coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }
}

/// Position in continuous world space measured in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    x: f32,
    y: f32,
}

impl WorldPos {
    /// Creates a new world position from explicit coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate in world units.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate in world units.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Returns the position displaced by the provided per-axis offsets.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Velocity in world units per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    x: f32,
    y: f32,
}

impl Velocity {
    /// Velocity with both components zeroed.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new velocity from explicit per-axis components.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal component in world units per second.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical component in world units per second.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }
}

/// Per-level configuration record consumed once by the generation pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    seed: u32,
    columns: u32,
    rows: u32,
    difficulty: u32,
    water_chance: f32,
}

impl LevelConfig {
    /// Creates a configuration record with explicit field values.
    #[must_use]
    pub const fn new(
        seed: u32,
        columns: u32,
        rows: u32,
        difficulty: u32,
        water_chance: f32,
    ) -> Self {
        Self {
            seed,
            columns,
            rows,
            difficulty,
            water_chance,
        }
    }

    /// Synthesizes the deterministic default configuration for a level index.
    ///
    /// Used whenever no stored configuration exists for the requested level.
    #[must_use]
    pub const fn for_level(index: u32) -> Self {
        Self {
            seed: index.wrapping_mul(1337),
            columns: 50,
            rows: 50,
            difficulty: 1,
            water_chance: 0.1,
        }
    }

    /// Master seed for every stream the pipeline derives.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Number of tile columns to generate.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows to generate.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Difficulty rating consumed by adapters when populating the level.
    #[must_use]
    pub const fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Per-attempt acceptance probability for the decoration pass.
    ///
    /// Values at or below zero disable the pass entirely.
    #[must_use]
    pub const fn water_chance(&self) -> f32 {
        self.water_chance
    }
}

/// Reasons the generation pipeline may fail.
///
/// Out-of-bounds coordinates are never represented here; bounds misses are
/// ordinary negative query results, not errors.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationError {
    /// Allocation failed for the grid or an auxiliary buffer.
    #[error("out of memory while allocating level buffers")]
    OutOfMemory,
    /// A corrective carve failed to rejoin the connected region within the
    /// maximum possible Manhattan distance.
    #[error("connectivity carve exceeded its step budget")]
    CarveBudgetExceeded,
}

/// Read-only view into the dense tile grid.
#[derive(Clone, Copy, Debug)]
pub struct TerrainView<'a> {
    kinds: &'a [TileKind],
    columns: u32,
    rows: u32,
}

impl<'a> TerrainView<'a> {
    /// Captures a new terrain view backed by the provided tile slice.
    #[must_use]
    pub fn new(kinds: &'a [TileKind], columns: u32, rows: u32) -> Self {
        Self {
            kinds,
            columns,
            rows,
        }
    }

    /// Returns the kind of the provided tile, if it lies within bounds.
    #[must_use]
    pub fn kind(&self, tile: TileCoord) -> Option<TileKind> {
        self.index(tile).and_then(|index| self.kinds.get(index)).copied()
    }

    /// Reports whether the provided tile is in bounds and walkable.
    #[must_use]
    pub fn is_walkable(&self, tile: TileCoord) -> bool {
        self.kind(tile).map_or(false, TileKind::is_walkable)
    }

    /// Converts a world position into the tile containing it.
    ///
    /// Positions with a negative coordinate or beyond the grid extent yield
    /// `None`; callers treat that as blocked terrain.
    #[must_use]
    pub fn tile_at(&self, position: WorldPos) -> Option<TileCoord> {
        if position.x() < 0.0 || position.y() < 0.0 {
            return None;
        }
        let column = (position.x() / TILE_LENGTH) as u32;
        let row = (position.y() / TILE_LENGTH) as u32;
        if column < self.columns && row < self.rows {
            Some(TileCoord::new(column, row))
        } else {
            None
        }
    }

    /// Returns the world position at the center of the provided tile.
    #[must_use]
    pub fn tile_center(&self, tile: TileCoord) -> WorldPos {
        WorldPos::new(
            (tile.column() as f32 + 0.5) * TILE_LENGTH,
            (tile.row() as f32 + 0.5) * TILE_LENGTH,
        )
    }

    /// Reports whether a footprint of the provided radius may occupy the
    /// provided center position.
    ///
    /// Samples the 3×3 cross product of `{-radius, 0, +radius}` offsets on
    /// both axes; every sample must land on an in-bounds walkable tile.
    #[must_use]
    pub fn can_occupy(&self, center: WorldPos, radius: f32) -> bool {
        let offsets = [-radius, 0.0, radius];
        for dy in offsets {
            for dx in offsets {
                let sample = center.offset(dx, dy);
                match self.tile_at(sample) {
                    Some(tile) if self.is_walkable(tile) => {}
                    _ => return false,
                }
            }
        }
        true
    }

    /// Grid center used as the spawn tile by the generation pipeline.
    #[must_use]
    pub const fn center(&self) -> TileCoord {
        TileCoord::new(self.columns / 2, self.rows / 2)
    }

    /// Returns an iterator over all tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = TileKind> + 'a {
        self.kinds.iter().copied()
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
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

/// Immutable representation of a single creature's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CreatureSnapshot {
    /// Unique identifier assigned to the creature.
    pub id: CreatureId,
    /// World position currently occupied by the creature.
    pub position: WorldPos,
    /// Velocity the creature applies on the next tick.
    pub velocity: Velocity,
    /// Collision footprint radius in world units.
    pub radius: f32,
    /// Walking speed in world units per second.
    pub speed: f32,
}

/// Read-only snapshot describing all creatures within the level.
#[derive(Clone, Debug, Default)]
pub struct CreatureView {
    snapshots: Vec<CreatureSnapshot>,
}

impl CreatureView {
    /// Creates a new creature view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CreatureSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &CreatureSnapshot> {
        self.snapshots.iter()
    }

    /// Unwraps the view into the snapshot list it carries.
    #[must_use]
    pub fn into_vec(self) -> Vec<CreatureSnapshot> {
        self.snapshots
    }
}
