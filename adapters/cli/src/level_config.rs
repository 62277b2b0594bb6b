use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use cavern_crawl_core::LevelConfig;

/// Loads the configuration for a level index, falling back to deterministic
/// defaults.
///
/// A missing or unreadable file is not an error: the per-index defaults
/// from [`LevelConfig::for_level`] apply. Within a readable file, every
/// recognised key overrides one field and malformed values keep that
/// field's default.
pub(crate) fn load_level_config(index: u32, override_path: Option<&Path>) -> LevelConfig {
    let fallback = LevelConfig::for_level(index);
    let path = override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_config_path(index));
    match fs::read_to_string(&path) {
        Ok(contents) => parse_level_config(&contents, fallback),
        Err(_) => fallback,
    }
}

fn parse_level_config(contents: &str, fallback: LevelConfig) -> LevelConfig {
    let mut seed = fallback.seed();
    let mut columns = fallback.columns();
    let mut rows = fallback.rows();
    let mut difficulty = fallback.difficulty();
    let mut water_chance = fallback.water_chance();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "seed" => seed = parsed_or(value, seed),
            "width" => columns = parsed_or(value, columns),
            "height" => rows = parsed_or(value, rows),
            "difficulty" => difficulty = parsed_or(value, difficulty),
            "water_chance" => water_chance = parsed_or(value, water_chance),
            _ => {}
        }
    }

    LevelConfig::new(seed, columns, rows, difficulty, water_chance)
}

fn parsed_or<T: FromStr>(value: &str, fallback: T) -> T {
    value.trim().parse().unwrap_or(fallback)
}

fn default_config_path(index: u32) -> PathBuf {
    PathBuf::from(format!("levels/configs/level_{index:03}.cfg"))
}
