pub mod formation;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::world::hex::{self, HEX_SIZE};
use crate::world::{HexCoord, TerrainGrid};

pub use formation::Formation;

pub const AGENT_SIZE: f64 = 10.0;
pub const FULL_STAMINA: f64 = 100.0;
/// Vertical gap between freshly spawned agents.
pub const SPAWN_SPACING: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Scout,
    Pillar,
    Hordier,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchetypeStats {
    pub base_speed: f64,
    pub strength: f64,
    pub endurance: f64,
}

impl Archetype {
    pub fn stats(self) -> ArchetypeStats {
        match self {
            Archetype::Scout => ArchetypeStats {
                base_speed: 2.0,
                strength: 30.0,
                endurance: 50.0,
            },
            Archetype::Pillar => ArchetypeStats {
                base_speed: 1.2,
                strength: 80.0,
                endurance: 80.0,
            },
            Archetype::Hordier => ArchetypeStats {
                base_speed: 1.5,
                strength: 50.0,
                endurance: 60.0,
            },
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Archetype::Scout => "Scout",
            Archetype::Pillar => "Pillar",
            Archetype::Hordier => "Hordier",
        }
    }
}

/// Default marching order: pillars up front, then scouts, then the hordiers.
pub const ROSTER: [Archetype; 10] = [
    Archetype::Pillar,
    Archetype::Pillar,
    Archetype::Scout,
    Archetype::Scout,
    Archetype::Hordier,
    Archetype::Hordier,
    Archetype::Hordier,
    Archetype::Hordier,
    Archetype::Hordier,
    Archetype::Hordier,
];

/// A horde member. Positions are in pixel space; `size` is the body radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub name: String,
    pub archetype: Archetype,
    pub position: DVec2,
    pub size: f64,
    pub base_speed: f64,
    pub current_speed: f64,
    pub strength: f64,
    pub endurance: f64,
    pub stamina: f64,
    pub target: Option<DVec2>,
    pub is_selected: bool,
}

impl Agent {
    pub fn new(id: usize, archetype: Archetype, position: DVec2) -> Self {
        let stats = archetype.stats();
        Self {
            id,
            name: format!("{} {}", archetype.display_name(), id),
            archetype,
            position,
            size: AGENT_SIZE,
            base_speed: stats.base_speed,
            current_speed: stats.base_speed,
            strength: stats.strength,
            endurance: stats.endurance,
            stamina: FULL_STAMINA,
            target: None,
            is_selected: false,
        }
    }

    pub fn contains(&self, point: DVec2) -> bool {
        self.position.distance(point) < self.size
    }

    /// The grid cell under the agent, which may be off-grid.
    pub fn hex(&self) -> HexCoord {
        hex::pixel_to_offset(self.position.x, self.position.y)
    }
}

/// Pixel position the horde gathers at: the spawn cell's centre, or a
/// quarter of the way across the grid at half its height.
pub fn spawn_origin(grid: &TerrainGrid, spawn_point: Option<HexCoord>) -> DVec2 {
    match spawn_point {
        Some(cell) => {
            let (x, y) = hex::offset_to_pixel(cell);
            DVec2::new(x, y)
        }
        None => {
            let (w, h) = hex::grid_pixel_size(grid.rows(), grid.cols());
            DVec2::new(w / 4.0, h / 2.0)
        }
    }
}

/// Lay the roster out in a vertical column centred on `origin`.
pub fn spawn_horde(origin: DVec2) -> Vec<Agent> {
    ROSTER
        .iter()
        .enumerate()
        .map(|(i, &archetype)| {
            let offset = (i as f64 - 5.0) * SPAWN_SPACING;
            Agent::new(i, archetype, origin + DVec2::new(0.0, offset))
        })
        .collect()
}

/// Topmost (last drawn) agent whose body contains `point`.
pub fn agent_at(agents: &[Agent], point: DVec2) -> Option<usize> {
    agents.iter().rposition(|a| a.contains(point))
}

/// Select every agent strictly inside the rectangle spanned by two corners.
///
/// Without `additive`, the previous selection is cleared first. Returns the
/// number of agents now selected.
pub fn select_in_rect(
    agents: &mut [Agent],
    corner_a: DVec2,
    corner_b: DVec2,
    additive: bool,
) -> usize {
    let min = corner_a.min(corner_b);
    let max = corner_a.max(corner_b);
    for agent in agents.iter_mut() {
        let p = agent.position;
        let inside = p.x > min.x && p.x < max.x && p.y > min.y && p.y < max.y;
        if inside {
            agent.is_selected = true;
        } else if !additive {
            agent.is_selected = false;
        }
    }
    agents.iter().filter(|a| a.is_selected).count()
}

/// Toggle one agent's selection. Without `additive` everyone else is deselected.
pub fn toggle_selection(agents: &mut [Agent], index: usize, additive: bool) {
    let Some(was_selected) = agents.get(index).map(|a| a.is_selected) else {
        return;
    };
    if !additive {
        for a in agents.iter_mut() {
            a.is_selected = false;
        }
    }
    agents[index].is_selected = !was_selected;
}

/// Indices of the selected agents, or of everyone when nobody is selected.
pub fn selected_or_all(agents: &[Agent]) -> Vec<usize> {
    let selected: Vec<usize> = agents
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_selected)
        .map(|(i, _)| i)
        .collect();
    if selected.is_empty() {
        (0..agents.len()).collect()
    } else {
        selected
    }
}

/// Average stamina of the selection (everyone if none selected).
pub fn mean_stamina(agents: &[Agent]) -> Option<f64> {
    let group = selected_or_all(agents);
    if group.is_empty() {
        return None;
    }
    let total: f64 = group.iter().map(|&i| agents[i].stamina).sum();
    Some(total / group.len() as f64)
}

/// The flag the horde must gather around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalZone {
    pub position: DVec2,
    pub size: f64,
    pub triggered: bool,
}

impl GoalZone {
    pub const FLAG_SIZE: f64 = HEX_SIZE * 1.5;

    /// Flag at the given cell, or three hexes in from the right edge at mid height.
    pub fn for_level(grid: &TerrainGrid, flag_position: Option<HexCoord>) -> Self {
        let position = match flag_position {
            Some(cell) => {
                let (x, y) = hex::offset_to_pixel(cell);
                DVec2::new(x, y)
            }
            None => {
                let (w, h) = hex::grid_pixel_size(grid.rows(), grid.cols());
                DVec2::new(w - HEX_SIZE * 3.0, h / 2.0)
            }
        };
        Self {
            position,
            size: Self::FLAG_SIZE,
            triggered: false,
        }
    }

    pub fn radius(&self, zone_scale: f64) -> f64 {
        self.size * zone_scale
    }

    pub fn contains(&self, point: DVec2, zone_scale: f64) -> bool {
        self.position.distance(point) < self.radius(zone_scale)
    }

    /// True when a non-empty horde stands entirely inside the zone.
    pub fn all_inside(&self, agents: &[Agent], zone_scale: f64) -> bool {
        !agents.is_empty() && agents.iter().all(|a| self.contains(a.position, zone_scale))
    }

    pub fn score(elapsed_seconds: f64) -> u32 {
        (10_000.0 - elapsed_seconds.round() * 10.0).max(0.0) as u32
    }
}
