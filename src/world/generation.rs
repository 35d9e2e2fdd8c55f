use noise::{NoiseFn, Perlin};
use rand::prelude::*;
use tracing::info;

use crate::config::generation::{GenerationParams, LayoutMode};
use crate::world::cell::HexCoord;
use crate::world::map::LevelMap;
use crate::world::TerrainGrid;

/// Coherent relief sampler: Perlin noise at `(col / scale, row / scale)`
/// mapped from `[-1, 1]` to `[0, 1]`.
pub fn perlin_relief(seed: u32, scale: f64) -> impl Fn(usize, usize) -> f64 {
    let perlin = Perlin::new(seed);
    move |row, col| {
        let n = perlin.get([col as f64 / scale, row as f64 / scale, 0.0]);
        ((n + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}

/// Generate a level from procedural parameters.
///
/// If `params.seed` is 0, a random seed is chosen. The actual seed used is
/// folded into the map name so the level can be regenerated.
pub fn generate_level(params: &GenerationParams) -> LevelMap {
    let seed = if params.seed == 0 {
        rand::thread_rng().r#gen()
    } else {
        params.seed
    };

    let grid = TerrainGrid::from_fn(
        params.rows,
        params.cols,
        perlin_relief(seed as u32, params.relief_scale),
    );
    let mut level = LevelMap::from_grid(format!("{}-{}", params.name, seed), grid);

    if params.layout == LayoutMode::Survival {
        let (spawn, flag) = survival_layout(params.rows, params.cols);
        level.spawn_point = Some(spawn);
        level.flag_position = Some(flag);
    }

    info!(
        rows = params.rows,
        cols = params.cols,
        seed,
        sources = level.sources.len(),
        "Level generated"
    );
    level
}

/// Horde starts in the top-left corner, the flag waits in the bottom-right.
pub fn survival_layout(rows: usize, cols: usize) -> (HexCoord, HexCoord) {
    let spawn = HexCoord::new(1, 1);
    let flag = HexCoord::new(rows.saturating_sub(2) as i32, cols.saturating_sub(2) as i32);
    (spawn, flag)
}

/// Print a summary of a level.
pub fn print_level_summary(level: &LevelMap) {
    println!("=== Level Summary ===");
    println!("Name: {}", level.name);
    println!("Cells: {} x {}", level.grid.rows(), level.grid.cols());
    println!("Wind sources: {}", level.sources.len());
    println!("Global wind multiplier: {:.2}", level.global_wind_multiplier);
    if let Some(s) = level.spawn_point {
        println!("Spawn: ({}, {})", s.row, s.col);
    }
    if let Some(f) = level.flag_position {
        println!("Flag: ({}, {})", f.row, f.col);
    }

    if level.grid.is_empty() {
        return;
    }
    let bands = [
        ("Lowland", 0.0, 0.3),
        ("Meadow", 0.3, 0.5),
        ("Upland", 0.5, 0.7),
        ("Ridge", 0.7, 1.01),
    ];
    let total = level.grid.len() as f64;
    println!("\nRelief:");
    for (name, lo, hi) in bands {
        let count = level
            .grid
            .cells()
            .iter()
            .filter(|c| c.relief >= lo && c.relief < hi)
            .count();
        println!(
            "  {:<10} {:>5} ({:.1}%)",
            name,
            count,
            count as f64 / total * 100.0
        );
    }
}
