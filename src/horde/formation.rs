use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::{selected_or_all, Agent};

/// Distance between neighbours in a formation, in pixels.
pub const FORMATION_SPACING: f64 = 35.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formation {
    /// Everyone converges on the same point.
    #[default]
    None,
    Line,
    Turtle,
    Triangle,
}

impl Formation {
    /// Marching speed imposed on every member that receives a target.
    pub fn speed(self) -> f64 {
        match self {
            Formation::Line => 1.8,
            Formation::Turtle => 0.8,
            Formation::Triangle => 1.4,
            Formation::None => 2.5,
        }
    }

    /// Slot offsets relative to the destination, facing +x. Rotated by the
    /// heading when targets are assigned.
    pub fn offsets(self, count: usize) -> Vec<DVec2> {
        let s = FORMATION_SPACING;
        match self {
            Formation::None => vec![DVec2::ZERO; count],
            Formation::Line => (0..count).map(|i| DVec2::new(-(i as f64) * s, 0.0)).collect(),
            Formation::Turtle => {
                let side = (count as f64).sqrt().ceil().max(1.0) as usize;
                (0..count)
                    .map(|i| DVec2::new(-((i % side) as f64) * s, -((i / side) as f64) * s))
                    .collect()
            }
            Formation::Triangle => {
                let mut offsets = Vec::with_capacity(count);
                let (mut row, mut in_row) = (0usize, 0usize);
                for _ in 0..count {
                    let r = row as f64;
                    offsets.push(DVec2::new(-r * s, (in_row as f64 - r / 2.0) * s));
                    in_row += 1;
                    if in_row > row {
                        row += 1;
                        in_row = 0;
                    }
                }
                offsets
            }
        }
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Formation::None => "none",
            Formation::Line => "line",
            Formation::Turtle => "turtle",
            Formation::Triangle => "triangle",
        };
        f.write_str(name)
    }
}

impl FromStr for Formation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Formation::None),
            "line" => Ok(Formation::Line),
            "turtle" => Ok(Formation::Turtle),
            "triangle" => Ok(Formation::Triangle),
            other => Err(format!(
                "Unknown formation '{}', expected none, line, turtle or triangle",
                other
            )),
        }
    }
}

/// Send the selected agents (everyone when none are selected) to `destination`.
///
/// Slots are rotated to face the destination from the group's centroid.
/// Returns how many agents were given a target.
pub fn set_group_target(agents: &mut [Agent], formation: Formation, destination: DVec2) -> usize {
    let members = selected_or_all(agents);
    if members.is_empty() {
        return 0;
    }

    let centroid = members
        .iter()
        .fold(DVec2::ZERO, |acc, &i| acc + agents[i].position)
        / members.len() as f64;
    let heading = destination - centroid;
    let rotation = DVec2::from_angle(heading.y.atan2(heading.x));
    let offsets = formation.offsets(members.len());
    let speed = formation.speed();

    for (&i, offset) in members.iter().zip(offsets) {
        let agent = &mut agents[i];
        agent.target = Some(destination + rotation.rotate(offset));
        agent.base_speed = speed;
    }
    members.len()
}
