//! Gust generation and propagation over the terrain grid.
//!
//! A tick reads the committed wind field, writes the next state into a
//! reusable buffer, and commits it at the end. Gusts hop at most one cell
//! per tick toward lower columns, taking the whole of their mass to the
//! single best-scoring downstream neighbor and leaving a trailing residue
//! behind them.

use std::f64::consts::PI;

use noise::{NoiseFn, Perlin};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::wind::{WindParams, WindSource};
use crate::world::cell::{HexCoord, WindVector};
use crate::world::TerrainGrid;

/// Chance that a source emits a gust on a given tick.
pub const DEFAULT_GUST_PROBABILITY: f64 = 0.4;
/// Cells at or below this mass are dropped instead of propagated.
pub const MASS_THRESHOLD: f64 = 0.01;
/// Fraction of a departing gust left behind in its cell.
pub const TRAIL_FRACTION: f64 = 0.3;
/// Gusts are born blowing toward decreasing column index.
pub const SOURCE_DIRECTION: f64 = PI;

/// Counters describing one wind tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindTickReport {
    pub gusts_emitted: u32,
    pub gusts_paused: u32,
    /// Gusts lost because no downstream neighbor was on the grid.
    pub dead_ends: u32,
    pub active_cells: usize,
    pub total_mass: f64,
    pub peak_mass: f64,
}

pub struct WindSimulator {
    rng: ChaCha8Rng,
    noise: Perlin,
    gust_probability: f64,
    next: Vec<WindVector>,
}

/// Parameters that govern a gust: its source's if it has one, else the grid-wide ones.
fn params_for<'a>(
    origin: Option<usize>,
    sources: &'a [WindSource],
    defaults: &'a WindParams,
) -> &'a WindParams {
    origin
        .and_then(|i| sources.get(i))
        .map(|s| &s.params)
        .unwrap_or(defaults)
}

impl WindSimulator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise: Perlin::new(seed as u32),
            gust_probability: DEFAULT_GUST_PROBABILITY,
            next: Vec::new(),
        }
    }

    /// Switch the RNG to an independent stream of the same seed.
    pub fn with_stream(mut self, stream: u64) -> Self {
        self.rng.set_stream(stream);
        self
    }

    pub fn with_gust_probability(mut self, probability: f64) -> Self {
        self.gust_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn gust_probability(&self) -> f64 {
        self.gust_probability
    }

    /// Run one tick: generate gusts, propagate, commit.
    ///
    /// `defaults` covers wind whose origin is unknown (e.g. loaded state).
    pub fn simulate(
        &mut self,
        grid: &mut TerrainGrid,
        sources: &[WindSource],
        defaults: &WindParams,
        sim_time: f64,
        global_multiplier: f64,
    ) -> WindTickReport {
        let mut report = WindTickReport::default();
        if grid.is_empty() {
            return report;
        }

        self.generate_gusts(grid, sources, sim_time, global_multiplier, &mut report);
        self.propagate(grid, sources, defaults, &mut report);
        grid.commit_wind(&self.next);

        for w in &self.next {
            if w.mass > 0.0 {
                report.active_cells += 1;
                report.total_mass += w.mass;
                report.peak_mass = report.peak_mass.max(w.mass);
            }
        }
        report
    }

    fn generate_gusts(
        &mut self,
        grid: &mut TerrainGrid,
        sources: &[WindSource],
        sim_time: f64,
        global_multiplier: f64,
        report: &mut WindTickReport,
    ) {
        for (i, source) in sources.iter().enumerate() {
            let Some(idx) = grid.index_of(source.position) else {
                continue;
            };

            if self.rng.r#gen::<f64>() < self.gust_probability {
                let params = &source.params;
                let n = self.noise.get([
                    source.position.row as f64 / params.source_scale,
                    sim_time,
                ]);
                let unit = ((n + 1.0) / 2.0).clamp(0.0, 1.0);
                let mass = (unit * params.max_mass * global_multiplier * source.gain)
                    .clamp(0.0, params.mass_ceiling());
                grid.set_wind_at(
                    idx,
                    WindVector {
                        mass,
                        celerity: params.celerity_for(mass),
                        direction: SOURCE_DIRECTION,
                        origin: Some(i),
                    },
                );
                report.gusts_emitted += 1;
            } else {
                let mut paused = grid.wind_at(idx);
                paused.mass = 0.0;
                grid.set_wind_at(idx, paused);
                report.gusts_paused += 1;
            }
        }
    }

    fn propagate(
        &mut self,
        grid: &TerrainGrid,
        sources: &[WindSource],
        defaults: &WindParams,
        report: &mut WindTickReport,
    ) {
        self.next.clear();
        self.next.resize(grid.len(), WindVector::CALM);

        let rows = grid.rows();
        let cols = grid.cols();

        for c in (0..cols).rev() {
            for r in 0..rows {
                let idx = r * cols + c;
                let current = grid.wind_at(idx);
                if current.mass <= MASS_THRESHOLD {
                    continue;
                }
                let params = params_for(current.origin, sources, defaults);
                let here = HexCoord::new(r as i32, c as i32);

                // Winner-take-all: ties keep the earliest candidate (W, NW, SW).
                let mut best: Option<(HexCoord, usize, f64)> = None;
                for (n, n_idx) in grid.downstream_cells(here) {
                    let terrain = 1.0 / (1.0 + grid.relief_at(n_idx) * params.relief_penalty);
                    let score = terrain + self.rng.r#gen::<f64>() * params.randomness;
                    if best.is_none_or(|(_, _, s)| score > s) {
                        best = Some((n, n_idx, score));
                    }
                }
                let Some((target, t_idx, _)) = best else {
                    report.dead_ends += 1;
                    continue;
                };

                let venturi = if params.venturi_enabled {
                    1.0 + (grid.relief_at(idx) - grid.relief_at(t_idx)).abs()
                } else {
                    1.0
                };
                let ceiling = params.mass_ceiling();
                let mass = (current.mass * venturi).min(ceiling);
                let d_row = (target.row - here.row) as f64;
                let d_col = (target.col - here.col) as f64;
                let direction = d_row.atan2(d_col);

                let slot = &mut self.next[t_idx];
                let cap = if slot.is_calm() {
                    ceiling
                } else {
                    ceiling.max(params_for(slot.origin, sources, defaults).mass_ceiling())
                };
                slot.merge(WindVector {
                    mass,
                    celerity: current.celerity,
                    direction,
                    origin: current.origin,
                });
                slot.mass = slot.mass.min(cap);

                let tail = current.mass * TRAIL_FRACTION;
                let own = &mut self.next[idx];
                if own.mass < tail {
                    *own = WindVector {
                        mass: tail,
                        ..current
                    };
                }
            }
        }
    }
}
