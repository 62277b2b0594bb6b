//! Connectivity verification and repair for generated grids.
//!
//! Smoothing can leave floor pockets with no route to the spawn tile. The
//! repairer floods 4-connected reachability from spawn, then carves a
//! corridor from every stranded floor tile toward the grid center until the
//! corridor rejoins the reachable region. Carving only ever converts wall to
//! floor, so reachability already established is never lost.

use std::collections::VecDeque;

use cavern_crawl_core::{GenerationError, TileCoord, TileKind};

use crate::TileMap;

/// Dense visited map produced by flooding reachability from one origin.
#[derive(Clone, Debug)]
struct ReachabilityField {
    columns: u32,
    rows: u32,
    marks: Vec<bool>,
}

impl ReachabilityField {
    /// Floods 4-connected reachability over floor tiles from `origin`.
    ///
    /// The frontier is an explicit queue so arbitrarily large caves never
    /// grow the call stack. An origin that is not floor marks nothing.
    fn flooded_from(map: &TileMap, origin: TileCoord) -> Result<Self, GenerationError> {
        let capacity = usize::try_from(u64::from(map.columns()) * u64::from(map.rows()))
            .map_err(|_| GenerationError::OutOfMemory)?;
        let mut marks = Vec::new();
        marks
            .try_reserve_exact(capacity)
            .map_err(|_| GenerationError::OutOfMemory)?;
        marks.resize(capacity, false);

        let mut field = Self {
            columns: map.columns(),
            rows: map.rows(),
            marks,
        };
        field.flood(map, origin);
        Ok(field)
    }

    fn flood(&mut self, map: &TileMap, origin: TileCoord) {
        if map.kind(origin) != Some(TileKind::Floor) {
            return;
        }
        self.mark(origin);
        let mut frontier = VecDeque::new();
        frontier.push_back(origin);

        while let Some(tile) = frontier.pop_front() {
            for neighbor in cardinal_neighbors(tile, self.columns, self.rows) {
                if self.is_marked(neighbor) {
                    continue;
                }
                if map.kind(neighbor) != Some(TileKind::Floor) {
                    continue;
                }
                self.mark(neighbor);
                frontier.push_back(neighbor);
            }
        }
    }

    /// Reports whether the tile was reached; out-of-bounds tiles never are.
    fn is_marked(&self, tile: TileCoord) -> bool {
        self.index(tile)
            .and_then(|index| self.marks.get(index).copied())
            .unwrap_or(false)
    }

    fn mark(&mut self, tile: TileCoord) {
        if let Some(slot) = self.index(tile).and_then(|index| self.marks.get_mut(index)) {
            *slot = true;
        }
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.column() < self.columns && tile.row() < self.rows {
            let column = usize::try_from(tile.column()).ok()?;
            let row = usize::try_from(tile.row()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            row.checked_mul(width)?.checked_add(column)
        } else {
            None
        }
    }
}

/// Reconnects every isolated floor pocket to the region reachable from
/// `spawn`.
///
/// The interior scan runs row-major, so when several pockets exist the one
/// closest to the top-left corner is connected first. The order carries no
/// meaning but keeps repaired grids reproducible.
pub(crate) fn repair(map: &mut TileMap, spawn: TileCoord) -> Result<(), GenerationError> {
    let mut field = ReachabilityField::flooded_from(map, spawn)?;
    for row in 1..map.rows().saturating_sub(1) {
        for column in 1..map.columns().saturating_sub(1) {
            let tile = TileCoord::new(column, row);
            if map.kind(tile) == Some(TileKind::Floor) && !field.is_marked(tile) {
                carve_toward_center(map, &mut field, tile)?;
            }
        }
    }
    Ok(())
}

/// Carves a corridor from `start` toward the grid center.
///
/// The cursor closes in on the center by at most one tile per axis per
/// iteration, carving each traversed tile to floor, and stops as soon as it
/// would enter a tile that was reachable before this carving run. The step
/// budget turns a carve that fails to rejoin within the maximum possible
/// Manhattan distance into an explicit error instead of an endless loop.
fn carve_toward_center(
    map: &mut TileMap,
    field: &mut ReachabilityField,
    start: TileCoord,
) -> Result<(), GenerationError> {
    let center = map.center();
    let budget = map.columns().saturating_add(map.rows());
    field.mark(start);

    let mut cursor = start;
    let mut steps = 0_u32;
    while cursor != center {
        if steps >= budget {
            return Err(GenerationError::CarveBudgetExceeded);
        }
        steps += 1;

        // One cardinal sub-step per axis keeps the corridor 4-connected.
        let next_column = step_component(cursor.column(), center.column());
        if next_column != cursor.column() {
            let next = TileCoord::new(next_column, cursor.row());
            if carve_into(map, field, next) {
                return Ok(());
            }
            cursor = next;
        }
        let next_row = step_component(cursor.row(), center.row());
        if next_row != cursor.row() {
            let next = TileCoord::new(cursor.column(), next_row);
            if carve_into(map, field, next) {
                return Ok(());
            }
            cursor = next;
        }
    }
    Ok(())
}

/// Carves one tile to floor. Returns `true` when the tile was already
/// reachable, meaning the corridor has rejoined the cave and the carve is
/// complete.
fn carve_into(map: &mut TileMap, field: &mut ReachabilityField, next: TileCoord) -> bool {
    if field.is_marked(next) {
        return true;
    }
    map.set_kind(next, TileKind::Floor);
    field.mark(next);
    false
}

const fn step_component(from: u32, toward: u32) -> u32 {
    if from < toward {
        from + 1
    } else if from > toward {
        from - 1
    } else {
        from
    }
}

fn cardinal_neighbors(tile: TileCoord, columns: u32, rows: u32) -> impl Iterator<Item = TileCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = tile.row().checked_sub(1) {
        candidates[count] = Some(TileCoord::new(tile.column(), row));
        count += 1;
    }

    if let Some(column) = tile.column().checked_add(1) {
        if column < columns {
            candidates[count] = Some(TileCoord::new(column, tile.row()));
            count += 1;
        }
    }

    if let Some(row) = tile.row().checked_add(1) {
        if row < rows {
            candidates[count] = Some(TileCoord::new(tile.column(), row));
            count += 1;
        }
    }

    if let Some(column) = tile.column().checked_sub(1) {
        candidates[count] = Some(TileCoord::new(column, tile.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}
