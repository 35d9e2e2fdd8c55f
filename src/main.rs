use clap::{Parser, Subcommand};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hordewind::cli::commands::{self, GenerateOptions, InspectTarget, RunOptions};
use hordewind::config::simulation::SimulationConfig;
use hordewind::horde::Formation;
use hordewind::persistence;
use hordewind::simulation::Simulation;

#[derive(Parser)]
#[command(name = "hordewind")]
#[command(about = "Wind-swept hex terrain simulation with a horde marching against the gusts")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a procedural level
    Generate {
        /// TOML file with generation parameters
        #[arg(short, long)]
        params: Option<String>,

        /// Grid rows (default: derived from the viewport)
        #[arg(long)]
        rows: Option<usize>,

        /// Grid columns (default: derived from the viewport)
        #[arg(long)]
        cols: Option<usize>,

        /// Relief seed (default: config seed, 0 = random)
        #[arg(long)]
        seed: Option<u64>,

        /// Spawn top-left, flag bottom-right
        #[arg(long)]
        survival: bool,

        /// Write the level as a map document
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run the simulation headless
    Run {
        /// Map document to load (default: procedural level)
        #[arg(short, long)]
        map: Option<String>,

        /// Number of frames to simulate
        #[arg(short, long, default_value_t = 3600)]
        frames: u64,

        /// Pixel destination "X,Y" (default: the goal flag)
        #[arg(short, long, value_parser = commands::parse_pair::<f64>)]
        target: Option<(f64, f64)>,

        /// none, line, turtle or triangle
        #[arg(long, default_value = "none")]
        formation: Formation,

        /// Save a snapshot when the run ends
        #[arg(long)]
        snapshot: bool,
    },

    /// Inspect a cell or the run from the latest snapshot
    Inspect {
        /// Cell "ROW,COL"
        #[arg(long, value_parser = commands::parse_pair::<i32>)]
        cell: Option<(i32, i32)>,

        /// Pixel position "X,Y"
        #[arg(long, value_parser = commands::parse_pair::<f64>)]
        pixel: Option<(f64, f64)>,

        /// Show a run-level summary
        #[arg(long)]
        world: bool,
    },

    /// Manage run snapshots
    Snapshots {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// List available snapshots
    List {
        /// Snapshot directory (default: from config)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Restore a run from a snapshot file and show its summary
    Restore {
        /// Path to the snapshot file
        file: String,
    },
}

fn init_logging(config: &SimulationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hordewind={}", config.log_level)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match SimulationConfig::load_or_default(Path::new(&cli.config)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config);
    if !Path::new(&cli.config).exists() {
        info!(path = %cli.config, "No config file, using defaults");
    }

    let result = match cli.command {
        Commands::Generate {
            params,
            rows,
            cols,
            seed,
            survival,
            output,
        } => commands::generate(
            &config,
            &GenerateOptions {
                params,
                rows,
                cols,
                seed,
                survival,
                output,
            },
        ),

        Commands::Run {
            map,
            frames,
            target,
            formation,
            snapshot,
        } => commands::run(
            &config,
            &RunOptions {
                map,
                frames,
                target,
                formation,
                snapshot,
            },
        ),

        Commands::Inspect { cell, pixel, world } => {
            let target = match (cell, pixel, world) {
                (Some((r, c)), _, _) => Some(InspectTarget::Cell(r, c)),
                (None, Some((x, y)), _) => Some(InspectTarget::Pixel(x, y)),
                (None, None, true) => Some(InspectTarget::World),
                (None, None, false) => None,
            };
            match target {
                Some(t) => commands::inspect(&config, t),
                None => Err("Specify --cell <ROW,COL>, --pixel <X,Y> or --world".to_string()),
            }
        }

        Commands::Snapshots { action } => match action {
            SnapshotAction::List { dir } => {
                let dir = dir.unwrap_or_else(|| config.snapshot_directory.clone());
                let snapshot_dir = Path::new(&dir);
                match persistence::list_snapshots(snapshot_dir) {
                    Ok(snapshots) => {
                        if snapshots.is_empty() {
                            println!("No snapshots found in {}", snapshot_dir.display());
                        } else {
                            println!("{:<40} {:>8} {:>12}", "File", "Frame", "Size");
                            println!("{}", "-".repeat(62));
                            for s in &snapshots {
                                let name = s
                                    .path
                                    .file_name()
                                    .and_then(|n| n.to_str())
                                    .unwrap_or("?");
                                println!(
                                    "{:<40} {:>8} {:>9} KB",
                                    name,
                                    s.frame,
                                    s.file_size / 1024
                                );
                            }
                            println!(
                                "\n{} snapshot(s) in {}",
                                snapshots.len(),
                                snapshot_dir.display()
                            );
                        }
                        Ok(())
                    }
                    Err(e) => Err(format!("Error listing snapshots: {}", e)),
                }
            }
            SnapshotAction::Restore { file } => {
                let path = Path::new(&file);
                persistence::load_snapshot(path)
                    .map(|state| {
                        println!("Restored run from {}", path.display());
                        let sim = Simulation::from_state(state, &config);
                        commands::print_run_summary(sim.state());
                    })
                    .map_err(|e| format!("Error restoring snapshot: {}", e))
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
