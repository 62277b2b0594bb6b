//! Cellular-automata cave generation used by the level crate.

use cavern_crawl_core::{TileCoord, TileKind, RNG_STREAM_TERRAIN};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::rng::stream;
use crate::TileMap;

/// Tunable parameters for the cave generator.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CaveTuning {
    /// Percent chance for an interior tile to start as wall.
    pub(crate) wall_chance_percent: u32,
    /// Number of smoothing rounds applied after the noise pass.
    pub(crate) smoothing_rounds: u32,
    /// Minimum walls in a 3x3 neighborhood for a tile to become wall.
    pub(crate) wall_rule_threshold: u32,
    /// Chebyshev radius of the force-cleared spawn square.
    pub(crate) spawn_clear_radius: u32,
}

impl Default for CaveTuning {
    fn default() -> Self {
        Self {
            wall_chance_percent: 35,
            smoothing_rounds: 3,
            wall_rule_threshold: 5,
            spawn_clear_radius: 3,
        }
    }
}

/// Overwrites every tile of the map with a freshly generated cave.
///
/// Noise from the terrain stream seeds the interior, a local-majority rule
/// smooths it into organic shapes, and the spawn square at the grid center
/// is force-cleared last. Border tiles become wall during the noise pass
/// and never change after.
pub(crate) fn generate(map: &mut TileMap, base_seed: u64, tuning: &CaveTuning) {
    let mut terrain_stream = stream(base_seed, RNG_STREAM_TERRAIN);
    scatter_noise(map, &mut terrain_stream, tuning.wall_chance_percent);
    for _ in 0..tuning.smoothing_rounds {
        smooth_once(map, tuning.wall_rule_threshold);
    }
    clear_spawn_zone(map, tuning.spawn_clear_radius);
}

/// Seeds the interior with independent wall draws; borders become wall.
///
/// Draws happen only for interior tiles so the consumed stream length is a
/// pure function of the grid dimensions.
fn scatter_noise(map: &mut TileMap, terrain_stream: &mut ChaCha8Rng, wall_chance_percent: u32) {
    for row in 0..map.rows() {
        for column in 0..map.columns() {
            let tile = TileCoord::new(column, row);
            let kind = if is_border(map, tile) {
                TileKind::Wall
            } else if terrain_stream.gen_range(0..100) < wall_chance_percent {
                TileKind::Wall
            } else {
                TileKind::Floor
            };
            map.set_kind(tile, kind);
        }
    }
}

/// Applies one double-buffered smoothing round to the interior.
///
/// Neighbor counts read the previous round's grid, never the tiles this
/// round already rewrote.
fn smooth_once(map: &mut TileMap, wall_rule_threshold: u32) {
    let previous = map.clone();
    for row in 1..map.rows().saturating_sub(1) {
        for column in 1..map.columns().saturating_sub(1) {
            let tile = TileCoord::new(column, row);
            let kind = if neighborhood_walls(&previous, tile) >= wall_rule_threshold {
                TileKind::Wall
            } else {
                TileKind::Floor
            };
            map.set_kind(tile, kind);
        }
    }
}

/// Counts wall tiles in the 3x3 neighborhood of an interior tile, self
/// included.
fn neighborhood_walls(map: &TileMap, tile: TileCoord) -> u32 {
    let mut walls = 0;
    for row in tile.row().saturating_sub(1)..=tile.row().saturating_add(1) {
        for column in tile.column().saturating_sub(1)..=tile.column().saturating_add(1) {
            if map.kind(TileCoord::new(column, row)) == Some(TileKind::Wall) {
                walls += 1;
            }
        }
    }
    walls
}

/// Force-clears the spawn square around the grid center.
///
/// Only interior tiles are cleared; the border invariant always wins.
fn clear_spawn_zone(map: &mut TileMap, radius: u32) {
    if map.columns() < 3 || map.rows() < 3 {
        return;
    }
    let center = map.center();
    let first_column = center.column().saturating_sub(radius).max(1);
    let last_column = center
        .column()
        .saturating_add(radius)
        .min(map.columns() - 2);
    let first_row = center.row().saturating_sub(radius).max(1);
    let last_row = center.row().saturating_add(radius).min(map.rows() - 2);
    for row in first_row..=last_row {
        for column in first_column..=last_column {
            map.set_kind(TileCoord::new(column, row), TileKind::Floor);
        }
    }
}

fn is_border(map: &TileMap, tile: TileCoord) -> bool {
    tile.column() == 0
        || tile.row() == 0
        || tile.column() + 1 == map.columns()
        || tile.row() + 1 == map.rows()
}

#[cfg(test)]
mod tests {
    use super::{generate, CaveTuning};
    use crate::TileMap;
    use cavern_crawl_core::{TileCoord, TileKind};

    #[test]
    fn borders_are_always_wall() {
        let mut map = TileMap::new(20, 15).expect("allocate");
        generate(&mut map, 99, &CaveTuning::default());

        for column in 0..20 {
            assert_eq!(map.kind(TileCoord::new(column, 0)), Some(TileKind::Wall));
            assert_eq!(map.kind(TileCoord::new(column, 14)), Some(TileKind::Wall));
        }
        for row in 0..15 {
            assert_eq!(map.kind(TileCoord::new(0, row)), Some(TileKind::Wall));
            assert_eq!(map.kind(TileCoord::new(19, row)), Some(TileKind::Wall));
        }
    }

    #[test]
    fn spawn_square_is_floor_before_repair() {
        let mut map = TileMap::new(30, 30).expect("allocate");
        generate(&mut map, 1234, &CaveTuning::default());

        let center = map.center();
        for row in 0..30 {
            for column in 0..30 {
                let tile = TileCoord::new(column, row);
                if tile.chebyshev_distance(center) <= 3 {
                    assert_eq!(
                        map.kind(tile),
                        Some(TileKind::Floor),
                        "tile {column},{row} inside the spawn square must be floor",
                    );
                }
            }
        }
    }

    #[test]
    fn identical_seeds_generate_identical_grids() {
        let mut first = TileMap::new(25, 25).expect("allocate");
        let mut second = TileMap::new(25, 25).expect("allocate");
        generate(&mut first, 7, &CaveTuning::default());
        generate(&mut second, 7, &CaveTuning::default());

        for row in 0..25 {
            for column in 0..25 {
                let tile = TileCoord::new(column, row);
                assert_eq!(first.kind(tile), second.kind(tile));
            }
        }
    }

    #[test]
    fn different_seeds_generate_different_interiors() {
        let mut first = TileMap::new(25, 25).expect("allocate");
        let mut second = TileMap::new(25, 25).expect("allocate");
        generate(&mut first, 7, &CaveTuning::default());
        generate(&mut second, 8, &CaveTuning::default());

        let differing = (0..25)
            .flat_map(|row| (0..25).map(move |column| TileCoord::new(column, row)))
            .filter(|tile| first.kind(*tile) != second.kind(*tile))
            .count();
        assert!(differing > 0, "independent seeds should diverge somewhere");
    }

    #[test]
    fn zero_noise_without_smoothing_leaves_interior_floor() {
        let tuning = CaveTuning {
            wall_chance_percent: 0,
            smoothing_rounds: 0,
            ..CaveTuning::default()
        };
        let mut map = TileMap::new(10, 10).expect("allocate");
        generate(&mut map, 42, &tuning);

        for row in 1..9 {
            for column in 1..9 {
                assert_eq!(
                    map.kind(TileCoord::new(column, row)),
                    Some(TileKind::Floor)
                );
            }
        }
        assert_eq!(map.kind(TileCoord::new(0, 0)), Some(TileKind::Wall));
        assert_eq!(map.kind(TileCoord::new(9, 9)), Some(TileKind::Wall));
    }

    #[test]
    fn smoothing_rule_closes_lone_gaps() {
        // A single floor tile walled in on all sides must smooth to wall.
        let mut map = TileMap::new(7, 7).expect("allocate");
        for row in 0..7 {
            for column in 0..7 {
                map.set_kind(TileCoord::new(column, row), TileKind::Wall);
            }
        }
        map.set_kind(TileCoord::new(3, 3), TileKind::Floor);

        super::smooth_once(&mut map, 5);
        assert_eq!(map.kind(TileCoord::new(3, 3)), Some(TileKind::Wall));
    }
}
