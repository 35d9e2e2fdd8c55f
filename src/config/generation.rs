use serde::{Deserialize, Serialize};
use std::path::Path;

/// Map layout mode. `campaign` places no spawn/flag; `survival` puts the
/// horde in the top-left corner and the flag in the bottom-right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Campaign,
    Survival,
}

/// Parameters used to procedurally generate a level.
/// Stored alongside the generated map for reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default)]
    pub seed: u64,
    pub rows: usize,
    pub cols: usize,
    #[serde(default = "default_relief_scale")]
    pub relief_scale: f64,
    #[serde(default)]
    pub layout: LayoutMode,
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_relief_scale() -> f64 {
    20.0
}

fn default_name() -> String {
    "procedural".to_string()
}

impl GenerationParams {
    pub fn new(rows: usize, cols: usize, seed: u64) -> Self {
        Self {
            seed,
            rows,
            cols,
            relief_scale: default_relief_scale(),
            layout: LayoutMode::Campaign,
            name: default_name(),
        }
    }

    /// Load generation parameters from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        let params: Self = toml::from_str(&content)
            .map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))?;
        params.validate()?;
        Ok(params)
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.rows == 0 || self.cols == 0 {
            return Err(format!(
                "rows and cols must be >= 1, got {}x{}",
                self.rows, self.cols
            ));
        }
        if !(self.relief_scale > 0.0) || !self.relief_scale.is_finite() {
            return Err(format!(
                "relief_scale must be a positive number, got {}",
                self.relief_scale
            ));
        }
        if self.layout == LayoutMode::Survival && (self.rows < 3 || self.cols < 3) {
            return Err(format!(
                "survival layout needs at least 3x3 cells, got {}x{}",
                self.rows, self.cols
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn valid_params() {
        assert!(GenerationParams::new(17, 25, 42).validate().is_ok());
    }

    #[test]
    fn zero_rows_rejected() {
        let err = GenerationParams::new(0, 25, 42).validate().unwrap_err();
        assert!(err.contains("rows"), "Error should mention rows: {}", err);
    }

    #[test]
    fn bad_relief_scale_rejected() {
        let params = GenerationParams {
            relief_scale: 0.0,
            ..GenerationParams::new(10, 10, 1)
        };
        let err = params.validate().unwrap_err();
        assert!(err.contains("relief_scale"), "Error: {}", err);
    }

    #[test]
    fn tiny_survival_map_rejected() {
        let params = GenerationParams {
            layout: LayoutMode::Survival,
            ..GenerationParams::new(2, 10, 1)
        };
        assert!(params.validate().unwrap_err().contains("survival"));
    }

    #[test]
    fn from_toml_string() {
        let toml_str = r#"
seed = 42
rows = 12
cols = 30
layout = "survival"
"#;
        let params: GenerationParams = toml::from_str(toml_str).unwrap();
        assert_eq!(params.seed, 42);
        assert_eq!(params.rows, 12);
        assert_eq!(params.relief_scale, 20.0);
        assert_eq!(params.layout, LayoutMode::Survival);
        params.validate().unwrap();
    }

    #[test]
    fn from_file_valid() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmpfile,
            r#"
rows = 8
cols = 9
relief_scale = 12.5
name = "gorge"
"#
        )
        .unwrap();

        let params = GenerationParams::from_file(tmpfile.path()).unwrap();
        assert_eq!(params.cols, 9);
        assert_eq!(params.relief_scale, 12.5);
        assert_eq!(params.name, "gorge");
        assert_eq!(params.layout, LayoutMode::Campaign);
    }

    #[test]
    fn from_file_missing() {
        let err = GenerationParams::from_file(Path::new("/nonexistent/file.toml")).unwrap_err();
        assert!(err.contains("Cannot read"), "Error: {}", err);
    }

    #[test]
    fn from_file_invalid_toml() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "this is not valid toml {{{{").unwrap();

        let err = GenerationParams::from_file(tmpfile.path()).unwrap_err();
        assert!(err.contains("Invalid TOML"), "Error: {}", err);
    }
}
