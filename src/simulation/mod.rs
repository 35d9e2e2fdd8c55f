pub mod movement;
pub mod occlusion;
pub mod statistics;
pub mod tempo;
pub mod wind;

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::simulation::SimulationConfig;
use crate::config::wind::{WindParams, WindSource, WindTempoParams};
use crate::horde::{self, Agent, Formation, GoalZone};
use crate::simulation::statistics::FrameStatistics;
use crate::simulation::tempo::TempoGate;
use crate::simulation::wind::{WindSimulator, WindTickReport};
use crate::world::{LevelMap, MapError, TerrainGrid};

/// Everything needed to resume a run. This is what snapshots hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub level_name: String,
    pub seed: u64,
    pub frame: u64,
    pub wind_ticks: u64,
    pub sim_time: f64,
    /// Wall-clock time of the first frame and of the latest one, in ms.
    pub started_at_ms: Option<f64>,
    pub clock_ms: f64,
    pub last_wind_tick_ms: f64,
    pub paused: bool,
    pub score: Option<u32>,
    pub grid: TerrainGrid,
    pub sources: Vec<WindSource>,
    pub wind_params: WindParams,
    pub tempo: WindTempoParams,
    pub global_wind_multiplier: f64,
    pub agents: Vec<Agent>,
    pub formation: Formation,
    pub goal: GoalZone,
}

impl SimulationState {
    /// Fresh state for a level: calm wind, horde at the spawn point.
    pub fn for_level(level: LevelMap, seed: u64) -> Self {
        let mut grid = level.grid;
        grid.clear_wind();
        let agents = horde::spawn_horde(horde::spawn_origin(&grid, level.spawn_point));
        let goal = GoalZone::for_level(&grid, level.flag_position);
        Self {
            level_name: level.name,
            seed,
            frame: 0,
            wind_ticks: 0,
            sim_time: 0.0,
            started_at_ms: None,
            clock_ms: 0.0,
            last_wind_tick_ms: 0.0,
            paused: false,
            score: None,
            grid,
            sources: level.sources,
            wind_params: level.wind_params,
            tempo: level.tempo,
            global_wind_multiplier: level.global_wind_multiplier,
            agents,
            formation: Formation::None,
            goal,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started_at_ms
            .map_or(0.0, |start| (self.clock_ms - start) / 1000.0)
    }
}

/// Outcome of one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: u64,
    /// Present when the tempo gate let a wind tick run this frame.
    pub wind: Option<WindTickReport>,
    pub arrived: usize,
    /// Score, on the frame the horde reached the goal.
    pub victory: Option<u32>,
    pub statistics: FrameStatistics,
}

/// Owns the grid, the horde and every piece of runtime machinery for one run.
pub struct Simulation {
    state: SimulationState,
    wind: WindSimulator,
    tempo: TempoGate,
    sim_time_step: f64,
    stamina_drain: f64,
    victory_zone_scale: f64,
}

fn resolve_seed(seed: u64) -> u64 {
    if seed == 0 {
        rand::thread_rng().r#gen()
    } else {
        seed
    }
}

impl Simulation {
    pub fn new(level: LevelMap, config: &SimulationConfig) -> Self {
        let seed = resolve_seed(config.seed);
        info!(
            level = %level.name,
            rows = level.grid.rows(),
            cols = level.grid.cols(),
            sources = level.sources.len(),
            seed,
            "Level loaded"
        );
        Self::from_state(SimulationState::for_level(level, seed), config)
    }

    /// Resume from saved state. The wind RNG continues on a stream keyed by
    /// the number of ticks already run.
    pub fn from_state(state: SimulationState, config: &SimulationConfig) -> Self {
        let wind = WindSimulator::new(state.seed)
            .with_stream(state.wind_ticks)
            .with_gust_probability(config.gust_probability);
        let tempo = TempoGate::new(state.seed.wrapping_add(1) as u32)
            .with_last_tick(state.last_wind_tick_ms);
        Self {
            state,
            wind,
            tempo,
            sim_time_step: config.sim_time_step,
            stamina_drain: config.stamina_drain,
            victory_zone_scale: config.victory_zone_scale,
        }
    }

    /// Replace the level from a map document.
    ///
    /// Parsing and validation finish before anything is touched, so a bad
    /// document leaves the running level as it was.
    pub fn load_map(&mut self, json: &str) -> Result<(), MapError> {
        let level = LevelMap::from_json(json)?;
        self.load_level(level);
        Ok(())
    }

    pub fn load_level(&mut self, level: LevelMap) {
        info!(
            level = %level.name,
            rows = level.grid.rows(),
            cols = level.grid.cols(),
            sources = level.sources.len(),
            "Level loaded"
        );
        let seed = self.state.seed;
        self.state = SimulationState::for_level(level, seed);
        self.wind = WindSimulator::new(seed).with_gust_probability(self.wind.gust_probability());
        self.tempo = TempoGate::new(seed.wrapping_add(1) as u32);
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn into_state(self) -> SimulationState {
        self.state
    }

    pub fn grid(&self) -> &TerrainGrid {
        &self.state.grid
    }

    pub fn agents(&self) -> &[Agent] {
        &self.state.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.state.agents
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
    }

    pub fn set_formation(&mut self, formation: Formation) {
        self.state.formation = formation;
    }

    /// Send the selection (or everyone) toward a pixel position in the active formation.
    pub fn set_group_target(&mut self, destination: glam::DVec2) -> usize {
        horde::formation::set_group_target(
            &mut self.state.agents,
            self.state.formation,
            destination,
        )
    }

    /// Run one wind tick immediately, bypassing the tempo gate.
    pub fn force_wind_tick(&mut self) -> WindTickReport {
        let s = &mut self.state;
        let report = self.wind.simulate(
            &mut s.grid,
            &s.sources,
            &s.wind_params,
            s.sim_time,
            s.global_wind_multiplier,
        );
        s.wind_ticks += 1;
        report
    }

    /// Advance one frame at wall-clock time `now_ms`. A paused simulation
    /// does nothing and returns `None`.
    pub fn step_frame(&mut self, now_ms: f64) -> Option<FrameReport> {
        if self.state.paused {
            return None;
        }
        if self.state.started_at_ms.is_none() {
            self.state.started_at_ms = Some(now_ms);
        }
        self.state.clock_ms = now_ms;
        self.state.frame += 1;
        self.state.sim_time += self.sim_time_step;

        let wind = if self
            .tempo
            .try_tick(now_ms, &self.state.tempo, self.state.sim_time)
        {
            self.state.last_wind_tick_ms = now_ms;
            let report = self.force_wind_tick();
            debug!(
                tick = self.state.wind_ticks,
                emitted = report.gusts_emitted,
                active_cells = report.active_cells,
                peak_mass = report.peak_mass,
                "Wind tick"
            );
            Some(report)
        } else {
            None
        };

        let s = &mut self.state;
        let arrived = movement::move_horde(&mut s.agents, &s.grid);
        movement::resolve_collisions(&mut s.agents);
        movement::drain_stamina(&mut s.agents, &s.grid, self.stamina_drain);

        let victory = self.check_victory();
        let s = &self.state;
        let statistics = statistics::compute_statistics(
            s.frame,
            &s.grid,
            &s.agents,
            &s.goal,
            self.victory_zone_scale,
        );

        Some(FrameReport {
            frame: s.frame,
            wind,
            arrived,
            victory,
            statistics,
        })
    }

    /// Triggers at most once per level; pauses the run and records the score.
    fn check_victory(&mut self) -> Option<u32> {
        let s = &mut self.state;
        if s.goal.triggered || !s.goal.all_inside(&s.agents, self.victory_zone_scale) {
            return None;
        }
        s.goal.triggered = true;
        s.paused = true;
        let elapsed = s.elapsed_seconds();
        let score = GoalZone::score(elapsed);
        s.score = Some(score);
        info!(
            level = %s.level_name,
            frame = s.frame,
            elapsed_secs = elapsed.round(),
            score,
            "Victory"
        );
        Some(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::HexCoord;
    use glam::DVec2;

    fn config() -> SimulationConfig {
        SimulationConfig {
            seed: 42,
            ..SimulationConfig::default()
        }
    }

    fn flat_level(rows: usize, cols: usize) -> LevelMap {
        LevelMap::from_grid("flat", TerrainGrid::from_fn(rows, cols, |_, _| 0.3))
    }

    fn run_frames(sim: &mut Simulation, frames: u64, frame_ms: f64) -> Vec<FrameReport> {
        (1..=frames)
            .filter_map(|f| sim.step_frame(f as f64 * frame_ms))
            .collect()
    }

    #[test]
    fn new_simulation_spawns_roster_in_calm() {
        let sim = Simulation::new(flat_level(12, 20), &config());
        assert_eq!(sim.agents().len(), 10);
        assert_eq!(sim.state().seed, 42);
        assert!(sim.grid().cells().iter().all(|c| c.wind.is_calm()));
        assert!(!sim.is_paused());
    }

    #[test]
    fn wind_ticks_follow_tempo() {
        let mut sim = Simulation::new(flat_level(12, 20), &config());
        let reports = run_frames(&mut sim, 120, 16.0);
        let ticks = reports.iter().filter(|r| r.wind.is_some()).count() as u64;
        // Intervals stay between 50ms and ~210ms over ~2s of frames
        assert!(ticks >= 8 && ticks <= 38, "ticks = {}", ticks);
        assert_eq!(sim.state().wind_ticks, ticks);
        assert_eq!(sim.state().frame, 120);
        assert!((sim.state().sim_time - 0.6).abs() < 1e-9);
    }

    #[test]
    fn wind_builds_up_and_stays_bounded() {
        let mut sim = Simulation::new(flat_level(12, 20), &config());
        for _ in 0..60 {
            sim.force_wind_tick();
        }
        let ceiling = WindParams::default().mass_ceiling();
        assert!(sim.grid().cells().iter().any(|c| c.wind.mass > 0.0));
        assert!(sim.grid().cells().iter().all(|c| c.wind.mass <= ceiling));
    }

    #[test]
    fn same_seed_same_run() {
        let run = || {
            let mut sim = Simulation::new(flat_level(10, 16), &config());
            sim.set_group_target(DVec2::new(600.0, 200.0));
            run_frames(&mut sim, 200, 16.0);
            sim.into_state()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn failed_load_keeps_previous_level() {
        let mut sim = Simulation::new(flat_level(6, 8), &config());
        sim.force_wind_tick();
        let before = sim.state().clone();

        assert!(sim.load_map("[[0.1, 0.2], [0.3]]").is_err());
        assert!(sim.load_map(r#"{"name": "no relief"}"#).is_err());
        assert_eq!(sim.state(), &before);
    }

    #[test]
    fn successful_load_resets_run() {
        let mut sim = Simulation::new(flat_level(6, 8), &config());
        run_frames(&mut sim, 30, 16.0);
        let next = r#"{
            "name": "next",
            "relief": [[0.5, 0.5, 0.5], [0.5, 0.5, 0.5]],
            "spawnPoint": {"r": 1, "c": 1}
        }"#;
        sim.load_map(next).unwrap();
        let s = sim.state();
        assert_eq!(s.level_name, "next");
        assert_eq!(s.frame, 0);
        assert_eq!(s.grid.rows(), 2);
        assert_eq!(s.seed, 42);
        let (x, _) = crate::world::hex::offset_to_pixel(HexCoord::new(1, 1));
        assert!(s.agents.iter().all(|a| a.position.x == x));
    }

    #[test]
    fn horde_marches_and_victory_pauses() {
        // Still air: the march only depends on distance and formation speed
        let level = LevelMap {
            spawn_point: Some(HexCoord::new(5, 2)),
            flag_position: Some(HexCoord::new(5, 12)),
            global_wind_multiplier: 0.0,
            ..flat_level(12, 20)
        };
        let mut sim = Simulation::new(level, &config());
        sim.set_formation(Formation::None);
        let flag = sim.state().goal.position;
        sim.set_group_target(flag);

        let mut victory = None;
        for f in 1..=2000 {
            match sim.step_frame(f as f64 * 16.0) {
                Some(report) => {
                    if report.victory.is_some() {
                        victory = report.victory;
                    }
                }
                None => break,
            }
        }
        let score = victory.expect("horde should reach the flag");
        assert!(sim.is_paused());
        assert!(sim.state().goal.triggered);
        assert_eq!(sim.state().score, Some(score));
        assert!(score > 9_000);

        // Paused runs ignore further frames
        let frame = sim.state().frame;
        assert!(sim.step_frame(1e9).is_none());
        assert_eq!(sim.state().frame, frame);
    }

    #[test]
    fn resumed_state_continues_counters() {
        let mut sim = Simulation::new(flat_level(8, 10), &config());
        run_frames(&mut sim, 50, 16.0);
        let state = sim.into_state();
        let ticks = state.wind_ticks;

        let mut resumed = Simulation::from_state(state, &config());
        resumed.step_frame(51.0 * 16.0);
        assert_eq!(resumed.state().frame, 51);
        assert!(resumed.state().wind_ticks >= ticks);
    }
}
