use std::collections::HashMap;

use crate::horde::{Agent, Archetype, GoalZone};
use crate::world::TerrainGrid;

/// Per-frame aggregate metrics for logging and inspection.
#[derive(Debug, Clone)]
pub struct FrameStatistics {
    pub frame: u64,
    pub active_wind_cells: u32,
    /// Fraction of cells carrying any wind, in [0, 1].
    pub wind_coverage: f32,
    pub total_wind_mass: f64,
    pub peak_wind_mass: f64,
    pub mean_stamina: f64,
    pub min_stamina: f64,
    /// Agents standing in wind, per archetype.
    pub exposed: HashMap<Archetype, u32>,
    pub agents_moving: u32,
    pub agents_in_goal: u32,
}

/// Compute statistics for the current grid and horde.
pub fn compute_statistics(
    frame: u64,
    grid: &TerrainGrid,
    agents: &[Agent],
    goal: &GoalZone,
    zone_scale: f64,
) -> FrameStatistics {
    let mut active = 0_u32;
    let mut total_mass = 0.0_f64;
    let mut peak_mass = 0.0_f64;
    for cell in grid.cells() {
        if cell.wind.mass > 0.0 {
            active += 1;
            total_mass += cell.wind.mass;
            peak_mass = peak_mass.max(cell.wind.mass);
        }
    }
    let coverage = if grid.is_empty() {
        0.0
    } else {
        active as f32 / grid.len() as f32
    };

    let mut exposed: HashMap<Archetype, u32> = HashMap::new();
    let mut total_stamina = 0.0_f64;
    let mut min_stamina = f64::INFINITY;
    let mut moving = 0_u32;
    let mut in_goal = 0_u32;
    for agent in agents {
        if grid.cell(agent.hex()).is_some_and(|c| !c.wind.is_calm()) {
            *exposed.entry(agent.archetype).or_insert(0) += 1;
        }
        total_stamina += agent.stamina;
        min_stamina = min_stamina.min(agent.stamina);
        if agent.target.is_some() {
            moving += 1;
        }
        if goal.contains(agent.position, zone_scale) {
            in_goal += 1;
        }
    }
    let (mean_stamina, min_stamina) = if agents.is_empty() {
        (0.0, 0.0)
    } else {
        (total_stamina / agents.len() as f64, min_stamina)
    };

    FrameStatistics {
        frame,
        active_wind_cells: active,
        wind_coverage: coverage,
        total_wind_mass: total_mass,
        peak_wind_mass: peak_mass,
        mean_stamina,
        min_stamina,
        exposed,
        agents_moving: moving,
        agents_in_goal: in_goal,
    }
}
