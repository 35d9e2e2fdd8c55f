use glam::DVec2;

use crate::horde::Agent;
use crate::simulation::occlusion::protection_factor;
use crate::world::cell::WindVector;
use crate::world::TerrainGrid;

/// Pair-separation passes per frame. Fixed, not run to convergence.
pub const COLLISION_ITERATIONS: usize = 3;
/// Strength at which an agent shrugs off wind entirely.
pub const STRENGTH_DAMPING: f64 = 125.0;

fn wind_under(agent: &Agent, grid: &TerrainGrid) -> WindVector {
    grid.cell(agent.hex())
        .map(|c| c.wind)
        .unwrap_or(WindVector::CALM)
}

/// Unsheltered resistance in `[0, 1]` for an agent heading to its target.
///
/// Full headwind resists in proportion to mass; crosswind and tailwind not at all.
pub fn wind_resistance(agent: &Agent, wind: WindVector) -> f64 {
    let Some(target) = agent.target else {
        return 0.0;
    };
    if wind.is_calm() {
        return 0.0;
    }
    let heading = target - agent.position;
    let move_angle = heading.y.atan2(heading.x);
    let against = (-(move_angle - wind.direction).cos()).max(0.0);
    let damping = (1.0 - agent.strength / STRENGTH_DAMPING).max(0.0);
    (against * wind.mass * damping).clamp(0.0, 1.0)
}

/// Speed `agents[index]` can manage this frame, shelter included.
pub fn effective_speed(agents: &[Agent], index: usize, grid: &TerrainGrid) -> f64 {
    let agent = &agents[index];
    let base = wind_resistance(agent, wind_under(agent, grid));
    let resistance = if base > 0.0 {
        (base * protection_factor(agents, index, grid)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    agent.base_speed * (1.0 - resistance)
}

/// Advance by `current_speed`. Returns true when the agent reached its target this step.
fn step_toward_target(agent: &mut Agent) -> bool {
    let Some(target) = agent.target else {
        return false;
    };
    let delta = target - agent.position;
    let dist = delta.length();
    if dist <= agent.current_speed {
        agent.position = target;
        agent.target = None;
        true
    } else {
        agent.position += delta / dist * agent.current_speed;
        false
    }
}

/// Move every agent one frame toward its target.
///
/// Speeds are all computed from the positions at the start of the frame, so
/// the order of agents does not change who shelters whom. Returns how many
/// agents arrived.
pub fn move_horde(agents: &mut [Agent], grid: &TerrainGrid) -> usize {
    let speeds: Vec<f64> = (0..agents.len())
        .map(|i| effective_speed(agents, i, grid))
        .collect();
    let mut arrived = 0;
    for (agent, speed) in agents.iter_mut().zip(speeds) {
        agent.current_speed = speed;
        if step_toward_target(agent) {
            arrived += 1;
        }
    }
    arrived
}

/// Push overlapping agents apart, half the overlap each.
pub fn resolve_collisions(agents: &mut [Agent]) {
    let n = agents.len();
    for _ in 0..COLLISION_ITERATIONS {
        for j in 0..n {
            for k in (j + 1)..n {
                let (head, tail) = agents.split_at_mut(k);
                let a = &mut head[j];
                let b = &mut tail[0];
                let delta = b.position - a.position;
                let dist = delta.length();
                let min_dist = a.size + b.size;
                if dist < min_dist {
                    let overlap = (min_dist - dist) / 2.0;
                    // Coincident agents separate along +x
                    let normal = if dist == 0.0 { DVec2::X } else { delta / dist };
                    a.position -= normal * overlap;
                    b.position += normal * overlap;
                }
            }
        }
    }
}

/// Wind wears agents down: `mass * rate` stamina per frame, floored at zero.
pub fn drain_stamina(agents: &mut [Agent], grid: &TerrainGrid, rate: f64) {
    for agent in agents.iter_mut() {
        let wind = wind_under(agent, grid);
        if wind.mass > 0.0 {
            agent.stamina = (agent.stamina - wind.mass * rate).max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horde::Archetype;
    use crate::world::HexCoord;

    fn windy_grid(mass: f64, direction: f64) -> TerrainGrid {
        let mut grid = TerrainGrid::from_fn(10, 20, |_, _| 0.5);
        for i in 0..grid.len() {
            grid.set_wind_at(
                i,
                WindVector {
                    mass,
                    celerity: 0.5,
                    direction,
                    origin: None,
                },
            );
        }
        grid
    }

    fn walker(x: f64, y: f64, target: DVec2) -> Agent {
        let mut a = Agent::new(0, Archetype::Hordier, DVec2::new(x, y));
        a.base_speed = 2.0;
        a.strength = 50.0;
        a.target = Some(target);
        a
    }

    #[test]
    fn headwind_slows_tailwind_does_not() {
        let grid = windy_grid(1.0, 0.0);

        let mut into = vec![walker(300.0, 200.0, DVec2::new(100.0, 200.0))];
        move_horde(&mut into, &grid);
        assert!(into[0].current_speed < 2.0);
        assert!((into[0].current_speed - 0.8).abs() < 1e-12);
        assert!((into[0].position.x - 299.2).abs() < 1e-12);

        let mut with = vec![walker(300.0, 200.0, DVec2::new(500.0, 200.0))];
        move_horde(&mut with, &grid);
        assert_eq!(with[0].current_speed, 2.0);
    }

    #[test]
    fn crosswind_has_no_effect() {
        let grid = windy_grid(1.0, 0.0);
        let mut agents = vec![walker(300.0, 200.0, DVec2::new(300.0, 400.0))];
        move_horde(&mut agents, &grid);
        assert!((agents[0].current_speed - 2.0).abs() < 1e-12);
    }

    #[test]
    fn blocker_upwind_raises_speed() {
        let grid = windy_grid(1.0, 0.0);
        let target = DVec2::new(100.0, 200.0);

        let mut alone = vec![walker(300.0, 200.0, target)];
        move_horde(&mut alone, &grid);

        let mut blocker = Agent::new(1, Archetype::Pillar, DVec2::new(250.0, 200.0));
        blocker.strength = 100.0;
        let mut sheltered = vec![walker(300.0, 200.0, target), blocker];
        move_horde(&mut sheltered, &grid);

        assert!(sheltered[0].current_speed > alone[0].current_speed);
    }

    #[test]
    fn strong_agents_ignore_wind() {
        let grid = windy_grid(1.0, 0.0);
        let mut agent = walker(300.0, 200.0, DVec2::new(100.0, 200.0));
        agent.strength = 130.0;
        assert_eq!(wind_resistance(&agent, grid.cell(agent.hex()).unwrap().wind), 0.0);
    }

    #[test]
    fn resistance_never_exceeds_one() {
        let grid = windy_grid(2.4, 0.0);
        let mut agent = walker(300.0, 200.0, DVec2::new(100.0, 200.0));
        agent.strength = 0.0;
        let mut agents = vec![agent];
        move_horde(&mut agents, &grid);
        assert_eq!(agents[0].current_speed, 0.0);
        assert_eq!(agents[0].position, DVec2::new(300.0, 200.0));
    }

    #[test]
    fn snaps_to_target_and_clears_it() {
        let grid = TerrainGrid::from_fn(10, 20, |_, _| 0.5);
        let mut agents = vec![walker(100.0, 100.0, DVec2::new(101.5, 100.0))];
        let arrived = move_horde(&mut agents, &grid);
        assert_eq!(arrived, 1);
        assert_eq!(agents[0].position, DVec2::new(101.5, 100.0));
        assert!(agents[0].target.is_none());

        // No target, no movement
        assert_eq!(move_horde(&mut agents, &grid), 0);
        assert_eq!(agents[0].position, DVec2::new(101.5, 100.0));
    }

    #[test]
    fn off_grid_agent_moves_at_base_speed() {
        let grid = windy_grid(1.0, 0.0);
        let mut agents = vec![walker(-1000.0, -1000.0, DVec2::new(-2000.0, -1000.0))];
        move_horde(&mut agents, &grid);
        assert_eq!(agents[0].current_speed, 2.0);
    }

    #[test]
    fn collision_separation_is_symmetric() {
        let mut agents = vec![
            Agent::new(0, Archetype::Hordier, DVec2::new(100.0, 100.0)),
            Agent::new(1, Archetype::Hordier, DVec2::new(105.0, 100.0)),
        ];
        let midpoint = (agents[0].position + agents[1].position) / 2.0;
        resolve_collisions(&mut agents);
        assert!(agents[0].position.distance(agents[1].position) >= 20.0 - 1e-9);
        let after = (agents[0].position + agents[1].position) / 2.0;
        assert!(after.distance(midpoint) < 1e-9);
    }

    #[test]
    fn coincident_agents_are_separated() {
        let mut agents = vec![
            Agent::new(0, Archetype::Scout, DVec2::new(50.0, 50.0)),
            Agent::new(1, Archetype::Scout, DVec2::new(50.0, 50.0)),
        ];
        resolve_collisions(&mut agents);
        assert_eq!(agents[0].position, DVec2::new(40.0, 50.0));
        assert_eq!(agents[1].position, DVec2::new(60.0, 50.0));
    }

    #[test]
    fn stamina_drains_with_mass_and_floors() {
        let grid = windy_grid(1.5, 0.0);
        let mut agents = vec![Agent::new(0, Archetype::Scout, DVec2::new(200.0, 200.0))];
        drain_stamina(&mut agents, &grid, 0.02);
        assert!((agents[0].stamina - 99.97).abs() < 1e-9);

        agents[0].stamina = 0.01;
        drain_stamina(&mut agents, &grid, 0.02);
        assert_eq!(agents[0].stamina, 0.0);
    }

    #[test]
    fn calm_air_keeps_stamina() {
        let mut grid = windy_grid(1.0, 0.0);
        grid.clear_wind();
        let mut agents = vec![Agent::new(0, Archetype::Scout, DVec2::new(200.0, 200.0))];
        drain_stamina(&mut agents, &grid, 0.02);
        assert_eq!(agents[0].stamina, 100.0);
        assert!(grid.cell(HexCoord::new(0, 0)).unwrap().wind.is_calm());
    }
}
