use std::path::Path;
use std::str::FromStr;

use glam::DVec2;
use tracing::{info, warn};

use crate::config::generation::{GenerationParams, LayoutMode};
use crate::config::simulation::SimulationConfig;
use crate::horde::{self, Formation};
use crate::persistence;
use crate::simulation::{Simulation, SimulationState};
use crate::world::generation::{generate_level, print_level_summary};
use crate::world::hex;
use crate::world::{HexCoord, LevelMap};

/// Parse `"A,B"` into a pair, for `--cell`, `--pixel` and `--target`.
pub fn parse_pair<T: FromStr>(s: &str) -> Result<(T, T), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("Expected two comma-separated values, got '{}'", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<T>()
            .map_err(|_| format!("Cannot parse '{}' in '{}'", v.trim(), s))
    };
    Ok((parse(a)?, parse(b)?))
}

/// Options for the `generate` command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// TOML file with generation parameters; flags override its values.
    pub params: Option<String>,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub seed: Option<u64>,
    pub survival: bool,
    pub output: Option<String>,
}

/// Generate a procedural level and optionally export it as a map document.
pub fn generate(config: &SimulationConfig, options: &GenerateOptions) -> Result<(), String> {
    let mut params = match &options.params {
        Some(path) => GenerationParams::from_file(Path::new(path))?,
        None => {
            let (rows, cols) = hex::grid_dimensions(config.viewport_width, config.viewport_height);
            GenerationParams::new(rows, cols, config.seed)
        }
    };
    if let Some(rows) = options.rows {
        params.rows = rows;
    }
    if let Some(cols) = options.cols {
        params.cols = cols;
    }
    if let Some(seed) = options.seed {
        params.seed = seed;
    }
    if options.survival {
        params.layout = LayoutMode::Survival;
    }
    params.validate()?;

    let level = generate_level(&params);
    print_level_summary(&level);

    if let Some(out) = &options.output {
        level
            .save(Path::new(out))
            .map_err(|e| format!("Cannot export map: {}", e))?;
        println!("\nMap written to {}", out);
    }
    Ok(())
}

/// Options for the `run` command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub map: Option<String>,
    pub frames: u64,
    pub target: Option<(f64, f64)>,
    pub formation: Formation,
    pub snapshot: bool,
}

fn load_or_generate(config: &SimulationConfig, map: Option<&str>) -> Result<LevelMap, String> {
    match map {
        Some(path) => LevelMap::from_file(Path::new(path)).map_err(|e| e.to_string()),
        None => {
            let (rows, cols) = hex::grid_dimensions(config.viewport_width, config.viewport_height);
            let params = GenerationParams::new(rows, cols, config.seed);
            Ok(generate_level(&params))
        }
    }
}

/// Run the simulation headless for a fixed number of frames.
///
/// Frames are spaced `frame_ms` apart on a virtual clock. Without an explicit
/// target the horde heads for the goal flag.
pub fn run(config: &SimulationConfig, options: &RunOptions) -> Result<(), String> {
    let level = load_or_generate(config, options.map.as_deref())?;
    let mut sim = Simulation::new(level, config);
    sim.set_formation(options.formation);

    let destination = match options.target {
        Some((x, y)) => DVec2::new(x, y),
        None => sim.state().goal.position,
    };
    let moving = sim.set_group_target(destination);
    info!(
        agents = moving,
        x = destination.x,
        y = destination.y,
        formation = %options.formation,
        "Horde ordered to move"
    );

    let mut last_report = None;
    for frame in 1..=options.frames {
        let Some(report) = sim.step_frame(frame as f64 * config.frame_ms) else {
            break;
        };
        if let Some(score) = report.victory {
            println!(
                "Victory at frame {} ({:.0}s) - score {}",
                report.frame,
                sim.state().elapsed_seconds(),
                score
            );
        }
        if report.frame % 500 == 0 {
            let stats = &report.statistics;
            info!(
                frame = report.frame,
                wind_ticks = sim.state().wind_ticks,
                active_cells = stats.active_wind_cells,
                peak_mass = stats.peak_wind_mass,
                mean_stamina = stats.mean_stamina,
                in_goal = stats.agents_in_goal,
                "Progress"
            );
        }
        last_report = Some(report);
    }

    print_run_summary(sim.state());
    if let Some(report) = &last_report {
        let stats = &report.statistics;
        println!(
            "Wind: {} active cells ({:.1}%), total mass {:.2}, peak {:.2}",
            stats.active_wind_cells,
            stats.wind_coverage * 100.0,
            stats.total_wind_mass,
            stats.peak_wind_mass
        );
    }

    if options.snapshot {
        let dir = Path::new(&config.snapshot_directory);
        let path = persistence::save_snapshot(sim.state(), dir)
            .map_err(|e| format!("Cannot save snapshot: {}", e))?;
        println!("Snapshot saved: {}", path.display());
        if let Err(e) = persistence::prune_snapshots(dir, config.max_snapshots as usize) {
            warn!(error = %e, "Snapshot pruning failed");
        }
    }
    Ok(())
}

/// What `inspect` should show.
#[derive(Debug, Clone, Copy)]
pub enum InspectTarget {
    Cell(i32, i32),
    Pixel(f64, f64),
    World,
}

/// Inspect a cell or the whole run from the latest snapshot.
pub fn inspect(config: &SimulationConfig, target: InspectTarget) -> Result<(), String> {
    let dir = Path::new(&config.snapshot_directory);
    let state = persistence::load_latest_valid_snapshot(dir)
        .map_err(|e| format!("Failed to load snapshot: {}", e))?;

    match target {
        InspectTarget::Cell(row, col) => inspect_cell(&state, HexCoord::new(row, col)),
        InspectTarget::Pixel(x, y) => {
            let cell = hex::pixel_to_offset(x, y);
            println!("Pixel ({:.1}, {:.1}) -> cell ({}, {})", x, y, cell.row, cell.col);
            if let Some(i) = horde::agent_at(&state.agents, DVec2::new(x, y)) {
                let a = &state.agents[i];
                println!("Agent: {} (stamina {:.1})", a.name, a.stamina);
            }
            inspect_cell(&state, cell)
        }
        InspectTarget::World => {
            print_run_summary(&state);
            Ok(())
        }
    }
}

fn inspect_cell(state: &SimulationState, coord: HexCoord) -> Result<(), String> {
    let cell = state.grid.cell(coord).ok_or_else(|| {
        format!(
            "Cell ({}, {}) is outside the {}x{} grid",
            coord.row,
            coord.col,
            state.grid.rows(),
            state.grid.cols()
        )
    })?;
    let (x, y) = hex::offset_to_pixel(coord);

    println!("=== Cell ({}, {}) ===", coord.row, coord.col);
    println!("Centre: ({:.1}, {:.1})", x, y);
    println!("Relief: {:.3}", cell.relief);
    println!("Source: {}", if cell.is_source { "yes" } else { "no" });
    println!();
    println!("--- Wind ---");
    if cell.wind.is_calm() {
        println!("  (calm)");
    } else {
        println!("  Mass: {:.3}", cell.wind.mass);
        println!("  Celerity: {:.3}", cell.wind.celerity);
        println!("  Direction: {:.0}°", cell.wind.direction.to_degrees());
        println!("  Pressure: {:.3}", cell.wind.pressure());
        if let Some(origin) = cell.wind.origin {
            println!("  Origin source: #{}", origin);
        }
    }
    let here: Vec<_> = state.agents.iter().filter(|a| a.hex() == coord).collect();
    if !here.is_empty() {
        println!();
        println!("--- Agents ---");
        for a in here {
            println!("  {} stamina {:.1} speed {:.2}", a.name, a.stamina, a.current_speed);
        }
    }
    Ok(())
}

/// Print a run overview: counters, goal, horde.
pub fn print_run_summary(state: &SimulationState) {
    println!("=== Run: {} ===", state.level_name);
    println!("Seed: {}", state.seed);
    println!("Frame: {} (wind ticks: {})", state.frame, state.wind_ticks);
    println!("Grid: {} x {}", state.grid.rows(), state.grid.cols());
    println!("Wind sources: {}", state.sources.len());
    println!("Formation: {}", state.formation);
    match state.score {
        Some(score) => println!("Goal reached, score {}", score),
        None => println!(
            "Goal at ({:.0}, {:.0}), not reached",
            state.goal.position.x, state.goal.position.y
        ),
    }
    if state.paused {
        println!("Paused");
    }
    println!();
    println!("--- Horde ---");
    for a in &state.agents {
        println!(
            "  {:<12} ({:>7.1}, {:>7.1}) stamina {:>5.1}{}",
            a.name,
            a.position.x,
            a.position.y,
            a.stamina,
            if a.target.is_some() { " moving" } else { "" }
        );
    }
    if let Some(mean) = horde::mean_stamina(&state.agents) {
        println!("Mean stamina: {:.1}", mean);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> SimulationConfig {
        SimulationConfig {
            seed: 3,
            snapshot_directory: dir.join("snaps").display().to_string(),
            max_snapshots: 2,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn parse_pair_accepts_two_values() {
        assert_eq!(parse_pair::<i32>("3,4"), Ok((3, 4)));
        assert_eq!(parse_pair::<f64>(" 1.5 , -2 "), Ok((1.5, -2.0)));
        assert!(parse_pair::<i32>("3").is_err());
        assert!(parse_pair::<i32>("a,4").is_err());
    }

    #[test]
    fn generate_exports_loadable_map() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("level.json");
        let options = GenerateOptions {
            rows: Some(8),
            cols: Some(12),
            seed: Some(5),
            survival: true,
            output: Some(out.display().to_string()),
            ..GenerateOptions::default()
        };
        generate(&config_in(dir.path()), &options).unwrap();

        let level = LevelMap::from_file(&out).unwrap();
        assert_eq!(level.grid.rows(), 8);
        assert_eq!(level.flag_position, Some(HexCoord::new(6, 10)));
    }

    #[test]
    fn generate_flags_override_params_file() {
        let dir = TempDir::new().unwrap();
        let params = dir.path().join("gen.toml");
        std::fs::write(&params, "rows = 6\ncols = 9\nseed = 11\nname = \"ridge\"\n").unwrap();
        let out = dir.path().join("level.json");
        let options = GenerateOptions {
            params: Some(params.display().to_string()),
            cols: Some(10),
            output: Some(out.display().to_string()),
            ..GenerateOptions::default()
        };
        generate(&config_in(dir.path()), &options).unwrap();

        let level = LevelMap::from_file(&out).unwrap();
        assert_eq!(level.name, "ridge-11");
        assert_eq!((level.grid.rows(), level.grid.cols()), (6, 10));
    }

    #[test]
    fn run_saves_and_prunes_snapshots_then_inspects() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let map = dir.path().join("map.json");
        LevelMap::from_json("[[0.2, 0.4, 0.6, 0.8], [0.1, 0.3, 0.5, 0.7], [0.5, 0.5, 0.5, 0.5]]")
            .unwrap()
            .save(&map)
            .unwrap();

        let options = RunOptions {
            map: Some(map.display().to_string()),
            frames: 60,
            // Away from the flag, so the run cannot end early in victory
            target: Some((-2000.0, -2000.0)),
            formation: Formation::Line,
            snapshot: true,
        };
        run(&config, &options).unwrap();

        let snaps = persistence::list_snapshots(Path::new(&config.snapshot_directory)).unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].frame, 60);

        inspect(&config, InspectTarget::World).unwrap();
        inspect(&config, InspectTarget::Cell(1, 2)).unwrap();
        let (x, y) = hex::offset_to_pixel(HexCoord::new(2, 1));
        inspect(&config, InspectTarget::Pixel(x, y)).unwrap();
        assert!(inspect(&config, InspectTarget::Cell(9, 9)).is_err());
    }

    #[test]
    fn run_with_missing_map_fails() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            map: Some("/nonexistent/level.json".to_string()),
            frames: 1,
            target: None,
            formation: Formation::None,
            snapshot: false,
        };
        let err = run(&config_in(dir.path()), &options).unwrap_err();
        assert!(err.contains("/nonexistent/level.json"));
    }

    #[test]
    fn inspect_without_snapshots_fails() {
        let dir = TempDir::new().unwrap();
        assert!(inspect(&config_in(dir.path()), InspectTarget::World).is_err());
    }
}
