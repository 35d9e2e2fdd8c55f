use serde::{Deserialize, Serialize};

use crate::world::cell::HexCoord;

/// Coefficients governing gust generation and propagation.
///
/// Missing keys in a map file fall back to these defaults, so a partial
/// object behaves like an overlay on the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindParams {
    pub source_scale: f64,
    #[serde(alias = "maxMasse")]
    pub max_mass: f64,
    #[serde(alias = "minCelerite")]
    pub min_celerity: f64,
    #[serde(alias = "maxCelerite")]
    pub max_celerity: f64,
    pub relief_penalty: f64,
    pub randomness: f64,
    pub venturi_enabled: bool,
}

impl Default for WindParams {
    fn default() -> Self {
        Self {
            source_scale: 10.0,
            max_mass: 1.2,
            min_celerity: 0.1,
            max_celerity: 1.0,
            relief_penalty: 1.0,
            randomness: 0.1,
            venturi_enabled: true,
        }
    }
}

impl WindParams {
    /// Hard ceiling for any cell's mass.
    pub fn mass_ceiling(&self) -> f64 {
        self.max_mass * 2.0
    }

    /// Weaker gusts travel faster: celerity falls linearly as mass approaches `max_mass`.
    pub fn celerity_for(&self, mass: f64) -> f64 {
        if self.max_mass <= 0.0 {
            return self.min_celerity;
        }
        let c = self.min_celerity
            + (1.0 - mass / self.max_mass) * (self.max_celerity - self.min_celerity);
        c.max(0.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        let checks = [
            ("sourceScale", self.source_scale, true),
            ("maxMass", self.max_mass, false),
            ("minCelerity", self.min_celerity, false),
            ("maxCelerity", self.max_celerity, false),
            ("reliefPenalty", self.relief_penalty, false),
            ("randomness", self.randomness, false),
        ];
        for (name, value, strictly_positive) in checks {
            if !value.is_finite() {
                errors.push(format!("{} must be finite, got {}", name, value));
            } else if strictly_positive && value <= 0.0 {
                errors.push(format!("{} must be > 0, got {}", name, value));
            } else if value < 0.0 {
                errors.push(format!("{} must be >= 0, got {}", name, value));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}

/// Controls the wall-clock rhythm at which wind ticks are allowed to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindTempoParams {
    /// Milliseconds.
    pub base_interval: f64,
    pub rhythm_frequency: f64,
    /// Milliseconds.
    pub rhythm_amplitude: f64,
    pub noise_influence: f64,
}

impl Default for WindTempoParams {
    fn default() -> Self {
        Self {
            base_interval: 120.0,
            rhythm_frequency: 0.5,
            rhythm_amplitude: 60.0,
            noise_influence: 0.5,
        }
    }
}

impl WindTempoParams {
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            ("baseInterval", self.base_interval),
            ("rhythmFrequency", self.rhythm_frequency),
            ("rhythmAmplitude", self.rhythm_amplitude),
            ("noiseInfluence", self.noise_influence),
        ];
        let bad: Vec<String> = values
            .iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(name, v)| format!("{} must be finite, got {}", name, v))
            .collect();
        if bad.is_empty() {
            Ok(())
        } else {
            Err(bad.join("\n"))
        }
    }
}

/// A wind emitter. Each source owns its parameter values outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindSource {
    pub position: HexCoord,
    pub params: WindParams,
    pub tempo: WindTempoParams,
    pub gain: f64,
}

impl WindSource {
    pub fn new(position: HexCoord, params: WindParams) -> Self {
        Self {
            position,
            params,
            tempo: WindTempoParams::default(),
            gain: 1.0,
        }
    }
}
