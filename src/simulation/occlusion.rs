use std::f64::consts::{PI, TAU};

use crate::horde::Agent;
use crate::world::TerrainGrid;

/// Cone length per point of strength, in pixels.
pub const SHADOW_LENGTH_PER_STRENGTH: f64 = 1.5;
/// Half-angle of a shadow cone at endurance 100.
pub const MAX_SHADOW_HALF_ANGLE: f64 = PI / 6.0;
/// Protection lost per point of the blocker's strength.
pub const SHELTER_PER_STRENGTH: f64 = 1.0 / 200.0;

/// Smallest absolute angle between two headings, in `[0, PI]`.
pub fn angle_between(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI { TAU - d } else { d }
}

/// Multiplicative wind protection for `agents[target]`, 1.0 meaning fully exposed.
///
/// Every other agent standing in wind casts a cone downwind of itself; each
/// cone covering the target multiplies in `1 - strength / 200`.
pub fn protection_factor(agents: &[Agent], target: usize, grid: &TerrainGrid) -> f64 {
    let Some(subject) = agents.get(target) else {
        return 1.0;
    };

    let mut protection = 1.0;
    for (i, blocker) in agents.iter().enumerate() {
        if i == target {
            continue;
        }
        let Some(cell) = grid.cell(blocker.hex()) else {
            continue;
        };
        let wind = cell.wind;
        if wind.is_calm() {
            continue;
        }

        let length = blocker.strength * SHADOW_LENGTH_PER_STRENGTH;
        let half_angle = (blocker.endurance / 100.0) * MAX_SHADOW_HALF_ANGLE;
        let to_subject = subject.position - blocker.position;
        if to_subject.length() > length {
            continue;
        }
        let bearing = to_subject.y.atan2(to_subject.x);
        if angle_between(bearing, wind.direction) <= half_angle {
            protection *= 1.0 - blocker.strength * SHELTER_PER_STRENGTH;
        }
    }
    protection
}
