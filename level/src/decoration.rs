//! Water decoration applied after connectivity repair.

use cavern_crawl_core::{TileCoord, TileKind, RNG_STREAM_DECORATION};
use rand::Rng;

use crate::rng::stream;
use crate::TileMap;

/// Minimum Manhattan distance from the grid center for water placement.
const SPAWN_KEEP_CLEAR: u32 = 6;

/// Converts qualifying floor patches to water.
///
/// Placement requires the tile and all eight neighbors to be floor, so
/// water never narrows a corridor or cuts the cave apart. `water_chance`
/// scales the per-attempt acceptance probability; zero or negative disables
/// the pass entirely. Attempts that land on unqualified tiles are skipped
/// without retry, so the final water count varies. Draws come from the
/// decoration stream, never the terrain stream, so toggling water leaves
/// the cave layout untouched.
pub(crate) fn decorate(map: &mut TileMap, base_seed: u64, water_chance: f32) {
    if water_chance <= 0.0 {
        return;
    }
    if map.columns() < 3 || map.rows() < 3 {
        return;
    }

    let permille = (water_chance.clamp(0.0, 1.0) * 1000.0) as u32;
    let attempts = u64::from(map.columns()) * u64::from(map.rows()) / 50;
    let center = map.center();
    let mut decoration_stream = stream(base_seed, RNG_STREAM_DECORATION);

    for _ in 0..attempts {
        let column = decoration_stream.gen_range(1..map.columns() - 1);
        let row = decoration_stream.gen_range(1..map.rows() - 1);
        let tile = TileCoord::new(column, row);

        if tile.manhattan_distance(center) <= SPAWN_KEEP_CLEAR {
            continue;
        }
        if !open_patch(map, tile) {
            continue;
        }
        if decoration_stream.gen_range(0..1000) < permille {
            map.set_kind(tile, TileKind::Water);
        }
    }
}

/// Reports whether the tile and all eight neighbors are floor.
fn open_patch(map: &TileMap, tile: TileCoord) -> bool {
    for row in tile.row().saturating_sub(1)..=tile.row().saturating_add(1) {
        for column in tile.column().saturating_sub(1)..=tile.column().saturating_add(1) {
            if map.kind(TileCoord::new(column, row)) != Some(TileKind::Floor) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{decorate, SPAWN_KEEP_CLEAR};
    use crate::TileMap;
    use cavern_crawl_core::{TileCoord, TileKind};

    fn open_cave(columns: u32, rows: u32) -> TileMap {
        let mut map = TileMap::new(columns, rows).expect("allocate");
        for row in 1..rows - 1 {
            for column in 1..columns - 1 {
                map.set_kind(TileCoord::new(column, row), TileKind::Floor);
            }
        }
        map
    }

    fn water_tiles(map: &TileMap) -> Vec<TileCoord> {
        let mut tiles = Vec::new();
        for row in 0..map.rows() {
            for column in 0..map.columns() {
                let tile = TileCoord::new(column, row);
                if map.kind(tile) == Some(TileKind::Water) {
                    tiles.push(tile);
                }
            }
        }
        tiles
    }

    #[test]
    fn water_lands_only_on_open_patches_away_from_spawn() {
        let mut map = open_cave(51, 51);
        decorate(&mut map, 31, 1.0);

        let waters = water_tiles(&map);
        assert!(!waters.is_empty(), "a 51x51 open cave gets 52 attempts");

        let center = map.center();
        for &water in &waters {
            assert!(water.manhattan_distance(center) > SPAWN_KEEP_CLEAR);
            // Every neighbor is still floor; two waters never touch, even
            // diagonally, because placement demanded an all-floor patch.
            for row in water.row() - 1..=water.row() + 1 {
                for column in water.column() - 1..=water.column() + 1 {
                    let tile = TileCoord::new(column, row);
                    if tile != water {
                        assert_eq!(map.kind(tile), Some(TileKind::Floor));
                    }
                }
            }
        }
    }

    #[test]
    fn zero_chance_disables_the_pass() {
        let mut map = open_cave(21, 21);
        let before = map.clone();

        decorate(&mut map, 31, 0.0);

        for row in 0..21 {
            for column in 0..21 {
                let tile = TileCoord::new(column, row);
                assert_eq!(map.kind(tile), before.kind(tile));
            }
        }
    }

    #[test]
    fn degenerate_grids_are_left_alone() {
        let mut map = TileMap::new(2, 2).expect("allocate");
        decorate(&mut map, 31, 1.0);
        assert!(water_tiles(&map).is_empty());
    }

    #[test]
    fn identical_seeds_place_identical_water() {
        let mut first = open_cave(31, 31);
        let mut second = open_cave(31, 31);

        decorate(&mut first, 555, 0.5);
        decorate(&mut second, 555, 0.5);

        assert_eq!(water_tiles(&first), water_tiles(&second));
    }

    #[test]
    fn walled_caves_get_no_water() {
        // All-wall grid: no attempt can find an open patch.
        let mut map = TileMap::new(31, 31).expect("allocate");
        decorate(&mut map, 31, 1.0);
        assert!(water_tiles(&map).is_empty());
    }
}
