use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    #[serde(default = "default_sim_time_step")]
    pub sim_time_step: f64,
    #[serde(default = "default_gust_probability")]
    pub gust_probability: f64,
    #[serde(default = "default_stamina_drain")]
    pub stamina_drain: f64,
    #[serde(default = "default_victory_zone_scale")]
    pub victory_zone_scale: f64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
    #[serde(default = "default_snapshot_directory")]
    pub snapshot_directory: String,
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_seed() -> u64 {
    0
}
fn default_frame_ms() -> f64 {
    16.0
}
fn default_sim_time_step() -> f64 {
    0.005
}
fn default_gust_probability() -> f64 {
    0.4
}
fn default_stamina_drain() -> f64 {
    0.02
}
fn default_victory_zone_scale() -> f64 {
    2.0
}
fn default_viewport_width() -> f64 {
    1280.0
}
fn default_viewport_height() -> f64 {
    720.0
}
fn default_snapshot_directory() -> String {
    "./snapshots".to_string()
}
fn default_max_snapshots() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            frame_ms: default_frame_ms(),
            sim_time_step: default_sim_time_step(),
            gust_probability: default_gust_probability(),
            stamina_drain: default_stamina_drain(),
            victory_zone_scale: default_victory_zone_scale(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            snapshot_directory: default_snapshot_directory(),
            max_snapshots: default_max_snapshots(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if !(self.frame_ms > 0.0) {
            errors.push(format!(
                "frame_ms must be > 0.0, got {}. Example: frame_ms = 16.0",
                self.frame_ms
            ));
        }

        if !(self.sim_time_step > 0.0) {
            errors.push(format!(
                "sim_time_step must be > 0.0, got {}. Example: sim_time_step = 0.005",
                self.sim_time_step
            ));
        }

        if !(0.0..=1.0).contains(&self.gust_probability) {
            errors.push(format!(
                "gust_probability must be 0.0-1.0, got {}. Example: gust_probability = 0.4",
                self.gust_probability
            ));
        }

        if !(self.stamina_drain >= 0.0) {
            errors.push(format!(
                "stamina_drain must be >= 0.0, got {}. Example: stamina_drain = 0.02",
                self.stamina_drain
            ));
        }

        if !(self.victory_zone_scale > 0.0) {
            errors.push(format!(
                "victory_zone_scale must be > 0.0, got {}. Example: victory_zone_scale = 2.0",
                self.victory_zone_scale
            ));
        }

        if !(self.viewport_width > 0.0) || !(self.viewport_height > 0.0) {
            errors.push(format!(
                "viewport_width and viewport_height must be > 0.0, got {}x{}. Example: viewport_width = 1280.0",
                self.viewport_width, self.viewport_height
            ));
        }

        if self.max_snapshots == 0 {
            errors.push(format!(
                "max_snapshots must be > 0, got {}. Example: max_snapshots = 10",
                self.max_snapshots
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, self.log_level
            ));
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            errors.push(format!(
                "log_format must be one of {:?}, got '{}'. Example: log_format = \"pretty\"",
                valid_formats, self.log_format
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}
