use noise::{NoiseFn, Perlin};

use crate::config::wind::WindTempoParams;

/// Wind ticks never run closer together than this, in milliseconds.
pub const MIN_INTERVAL_MS: f64 = 50.0;

/// Decides whether a wind tick is due at a given wall-clock time.
///
/// The interval breathes with a sine rhythm plus a slow Perlin wobble, so
/// gusts arrive in irregular waves rather than a metronome beat.
#[derive(Clone)]
pub struct TempoGate {
    noise: Perlin,
    last_tick_ms: f64,
}

impl TempoGate {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: Perlin::new(seed),
            last_tick_ms: 0.0,
        }
    }

    /// Resume gating from a known last tick time.
    pub fn with_last_tick(mut self, last_tick_ms: f64) -> Self {
        self.last_tick_ms = last_tick_ms;
        self
    }

    pub fn last_tick_ms(&self) -> f64 {
        self.last_tick_ms
    }

    pub fn interval(&self, params: &WindTempoParams, sim_time: f64) -> f64 {
        let rhythm = (sim_time * params.rhythm_frequency).sin() * params.rhythm_amplitude;
        let wobble = self.noise.get([sim_time * 0.1, 100.0])
            * params.noise_influence
            * (params.rhythm_amplitude / 2.0);
        (params.base_interval + rhythm + wobble).max(MIN_INTERVAL_MS)
    }

    /// True (and the clock is reset) when more than one interval has passed.
    pub fn try_tick(&mut self, now_ms: f64, params: &WindTempoParams, sim_time: f64) -> bool {
        if now_ms - self.last_tick_ms > self.interval(params, sim_time) {
            self.last_tick_ms = now_ms;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady(base: f64) -> WindTempoParams {
        WindTempoParams {
            base_interval: base,
            rhythm_frequency: 0.0,
            rhythm_amplitude: 0.0,
            noise_influence: 0.0,
        }
    }

    #[test]
    fn interval_never_below_floor() {
        let gate = TempoGate::new(1);
        let params = WindTempoParams {
            base_interval: 10.0,
            rhythm_amplitude: 200.0,
            ..WindTempoParams::default()
        };
        for i in 0..500 {
            assert!(gate.interval(&params, i as f64 * 0.37) >= MIN_INTERVAL_MS);
        }
    }

    #[test]
    fn steady_tempo_ticks_on_schedule() {
        let mut gate = TempoGate::new(1);
        let params = steady(100.0);
        let ticks: Vec<u32> = (1..=40)
            .map(|frame| frame * 16)
            .filter(|&now| gate.try_tick(now as f64, &params, 0.0))
            .collect();
        // Strictly greater than 100ms since the last tick
        assert_eq!(ticks, vec![112, 224, 336, 448, 560]);
    }

    #[test]
    fn rhythm_swings_interval() {
        let gate = TempoGate::new(1);
        let params = WindTempoParams {
            noise_influence: 0.0,
            ..WindTempoParams::default()
        };
        let peak = gate.interval(&params, std::f64::consts::PI);
        let trough = gate.interval(&params, 3.0 * std::f64::consts::PI);
        assert!((peak - 180.0).abs() < 1e-9);
        assert!((trough - 60.0).abs() < 1e-9);
    }

    #[test]
    fn resumed_gate_waits_from_last_tick() {
        let mut gate = TempoGate::new(1).with_last_tick(1000.0);
        let params = steady(100.0);
        assert!(!gate.try_tick(1050.0, &params, 0.0));
        assert!(gate.try_tick(1101.0, &params, 0.0));
        assert_eq!(gate.last_tick_ms(), 1101.0);
    }
}
