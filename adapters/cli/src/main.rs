#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates caverns and lets creatures wander them.

mod level_config;
mod map_transfer;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use cavern_crawl_core::{
    Command, Event, LevelConfig, TerrainView, TileCoord, TileKind, WorldPos,
    DEFAULT_CREATURE_RADIUS, DEFAULT_CREATURE_SPEED,
};
use cavern_crawl_level::{self as level, query, Level};
use cavern_crawl_system_wander::Wander;
use clap::Parser;

use crate::level_config::load_level_config;
use crate::map_transfer::MapSnapshot;

/// Fixed simulation timestep, 60 ticks per second.
const TICK_DT: Duration = Duration::from_micros(16_667);
/// Minimum Manhattan distance between the spawn clearing and creature starts.
const SPAWN_EXCLUSION: u32 = 8;

/// Command-line arguments accepted by the cavern generator.
#[derive(Debug, Parser)]
#[command(name = "cavern-crawl", about = "Generates caverns and simulates wandering creatures")]
struct Args {
    /// Level index used for deterministic defaults and config file lookup.
    #[arg(long, default_value_t = 0)]
    level: u32,
    /// Path to a key=value config file overriding the indexed defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of fixed 60 Hz ticks to simulate.
    #[arg(long, default_value_t = 120)]
    ticks: u32,
    /// Number of creatures to spawn; defaults to twice the difficulty.
    #[arg(long)]
    creatures: Option<u32>,
    /// Disable the water decoration pass.
    #[arg(long)]
    no_water: bool,
    /// Print the generated map as a single-line transfer string.
    #[arg(long)]
    export: bool,
    /// Decode a transfer string, print the contained map and exit.
    #[arg(long, value_name = "SNAPSHOT")]
    import: Option<String>,
}

/// Entry point for the cavern-crawl command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(encoded) = &args.import {
        let snapshot = MapSnapshot::decode(encoded)?;
        print_imported(&snapshot);
        return Ok(());
    }

    let mut config = load_level_config(args.level, args.config.as_deref());
    if args.no_water {
        config = LevelConfig::new(
            config.seed(),
            config.columns(),
            config.rows(),
            config.difficulty(),
            0.0,
        );
    }

    let mut level = Level::new();
    let mut events = Vec::new();
    level::apply(&mut level, Command::LoadLevel { config }, &mut events);
    for event in &events {
        if let Event::LevelRejected { reason } = event {
            bail!("level {} generation failed: {reason}", args.level);
        }
    }

    let requested = args
        .creatures
        .unwrap_or_else(|| config.difficulty().saturating_mul(2));
    for position in spawn_positions(&level, requested) {
        level::apply(
            &mut level,
            Command::SpawnCreature {
                position,
                radius: DEFAULT_CREATURE_RADIUS,
                speed: DEFAULT_CREATURE_SPEED,
            },
            &mut events,
        );
    }

    let mut wander = Wander::default();
    let mut commands = Vec::new();
    wander.handle(&events, &mut commands);

    for _ in 0..args.ticks {
        let mut tick_events = Vec::new();
        level::apply(&mut level, Command::Tick { dt: TICK_DT }, &mut tick_events);
        wander.handle(&tick_events, &mut commands);
        for command in commands.drain(..) {
            level::apply(&mut level, command, &mut tick_events);
        }
    }

    print_summary(&level);

    if args.export {
        let snapshot =
            MapSnapshot::from_terrain(&query::terrain(&level), query::level_seed(&level));
        println!("{}", snapshot.encode());
    }

    Ok(())
}

/// Deterministically selects creature start tiles spread across the cave.
///
/// Candidates are walkable tile centers outside the spawn clearing, taken
/// in row-major order with a stride that spreads the picks over the whole
/// grid. Fewer candidates than requested creatures yields fewer creatures.
fn spawn_positions(level: &Level, requested: u32) -> Vec<WorldPos> {
    let requested = usize::try_from(requested).unwrap_or(0);
    if requested == 0 {
        return Vec::new();
    }

    let view = query::terrain(level);
    let center = view.center();
    let (columns, rows) = view.dimensions();
    let mut candidates = Vec::new();
    for row in 0..rows {
        for column in 0..columns {
            let tile = TileCoord::new(column, row);
            if tile.manhattan_distance(center) < SPAWN_EXCLUSION {
                continue;
            }
            let position = view.tile_center(tile);
            if view.can_occupy(position, DEFAULT_CREATURE_RADIUS) {
                candidates.push(position);
            }
        }
    }
    if candidates.is_empty() {
        return Vec::new();
    }

    let stride = (candidates.len() / requested).max(1);
    candidates
        .into_iter()
        .step_by(stride)
        .take(requested)
        .collect()
}

fn print_summary(level: &Level) {
    let view = query::terrain(level);
    let (columns, rows) = view.dimensions();
    let mut walkable = 0_u32;
    let mut water = 0_u32;
    for kind in view.iter() {
        if kind.is_walkable() {
            walkable += 1;
        } else if kind == TileKind::Water {
            water += 1;
        }
    }
    println!(
        "level seed {} ({columns}x{rows}): {walkable} walkable tiles, {water} water",
        query::level_seed(level)
    );
    render_map(&view);

    println!(
        "simulated {} ticks at 60 Hz; {} creatures:",
        query::tick_count(level),
        query::creature_count(level)
    );
    for snapshot in query::creatures(level).iter() {
        println!(
            "  creature {:>3} at ({:>7.1}, {:>7.1})",
            snapshot.id.get(),
            snapshot.position.x(),
            snapshot.position.y()
        );
    }
}

fn render_map(view: &TerrainView<'_>) {
    let (columns, rows) = view.dimensions();
    for row in 0..rows {
        let mut line = String::with_capacity(usize::try_from(columns).unwrap_or(0));
        for column in 0..columns {
            let kind = view
                .kind(TileCoord::new(column, row))
                .unwrap_or(TileKind::Wall);
            line.push(map_transfer::glyph(kind));
        }
        println!("{line}");
    }
}

fn print_imported(snapshot: &MapSnapshot) {
    println!(
        "imported map {}x{} (seed {})",
        snapshot.columns, snapshot.rows, snapshot.seed
    );
    for line in &snapshot.tiles {
        println!("{line}");
    }
}
