//! Map documents at the boundary of the simulation.
//!
//! Three shapes are accepted and normalized into one [`LevelMap`]:
//! a bare relief matrix, an object carrying a single global `windParams`
//! block, and the current object form where every source carries its own
//! parameters. Nothing downstream of [`LevelMap`] knows about the older shapes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::config::wind::{WindParams, WindSource, WindTempoParams};
use crate::world::cell::HexCoord;
use crate::world::TerrainGrid;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("Malformed map JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Map must be a relief matrix or an object with a `relief` array, got {0}")]
    UnexpectedShape(&'static str),
    #[error("Relief row {row} is empty")]
    EmptyRow { row: usize },
    #[error("Relief row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Relief at ({row}, {col}) is not a finite number")]
    NonFiniteRelief { row: usize, col: usize },
    #[error("Invalid wind parameters: {0}")]
    InvalidParams(String),
    #[error("Cannot read map {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// On-disk object form of a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapDocument {
    #[serde(default = "default_map_name")]
    name: String,
    #[serde(default)]
    order: i64,
    #[serde(default)]
    completed: bool,
    relief: Vec<Vec<f64>>,
    #[serde(default)]
    spawn_point: Option<HexCoord>,
    #[serde(default)]
    flag_position: Option<HexCoord>,
    #[serde(default)]
    wind_sources: Vec<SourceDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wind_params: Option<WindParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wind_tempo_params: Option<WindTempoParams>,
    #[serde(default)]
    global_wind_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceDocument {
    r: i32,
    c: i32,
    #[serde(default)]
    gain: Option<f64>,
    #[serde(default)]
    wind_params: Option<WindParams>,
    #[serde(default)]
    wind_tempo_params: Option<WindTempoParams>,
}

fn default_map_name() -> String {
    "untitled".to_string()
}

/// A fully normalized level: validated terrain and sources that each own
/// their parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelMap {
    pub name: String,
    pub order: i64,
    pub completed: bool,
    pub grid: TerrainGrid,
    pub spawn_point: Option<HexCoord>,
    pub flag_position: Option<HexCoord>,
    pub sources: Vec<WindSource>,
    /// Parameters for wind not attributed to any source.
    pub wind_params: WindParams,
    /// Drives tick scheduling for the whole map.
    pub tempo: WindTempoParams,
    pub global_wind_multiplier: f64,
}

impl LevelMap {
    /// Wrap a grid with default sources at its flagged cells.
    pub fn from_grid(name: impl Into<String>, grid: TerrainGrid) -> Self {
        let wind_params = WindParams::default();
        let tempo = WindTempoParams::default();
        let sources = grid
            .source_positions()
            .into_iter()
            .map(|pos| WindSource {
                tempo: tempo.clone(),
                ..WindSource::new(pos, wind_params.clone())
            })
            .collect();
        Self {
            name: name.into(),
            order: 0,
            completed: false,
            grid,
            spawn_point: None,
            flag_position: None,
            sources,
            wind_params,
            tempo,
            global_wind_multiplier: 1.0,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, MapError> {
        let content = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse any accepted map shape. Fails without side effects on malformed input.
    pub fn from_json(content: &str) -> Result<Self, MapError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let document = match value {
            serde_json::Value::Array(_) => {
                let relief: Vec<Vec<f64>> = serde_json::from_value(value)?;
                MapDocument {
                    name: default_map_name(),
                    order: 0,
                    completed: false,
                    relief,
                    spawn_point: None,
                    flag_position: None,
                    wind_sources: Vec::new(),
                    wind_params: None,
                    wind_tempo_params: None,
                    global_wind_multiplier: None,
                }
            }
            serde_json::Value::Object(_) => serde_json::from_value(value)?,
            serde_json::Value::Null => return Err(MapError::UnexpectedShape("null")),
            serde_json::Value::Bool(_) => return Err(MapError::UnexpectedShape("a boolean")),
            serde_json::Value::Number(_) => return Err(MapError::UnexpectedShape("a number")),
            serde_json::Value::String(_) => return Err(MapError::UnexpectedShape("a string")),
        };
        Self::normalize(document)
    }

    fn normalize(doc: MapDocument) -> Result<Self, MapError> {
        let wind_params = doc.wind_params.unwrap_or_default();
        wind_params.validate().map_err(MapError::InvalidParams)?;
        let tempo = doc.wind_tempo_params.unwrap_or_default();
        tempo.validate().map_err(MapError::InvalidParams)?;

        let global_wind_multiplier = doc.global_wind_multiplier.unwrap_or(1.0);
        if !global_wind_multiplier.is_finite() || global_wind_multiplier < 0.0 {
            return Err(MapError::InvalidParams(format!(
                "globalWindMultiplier must be >= 0, got {}",
                global_wind_multiplier
            )));
        }

        let mut sources = Vec::with_capacity(doc.wind_sources.len());
        for (i, s) in doc.wind_sources.into_iter().enumerate() {
            let params = s.wind_params.unwrap_or_else(|| wind_params.clone());
            params
                .validate()
                .map_err(|e| MapError::InvalidParams(format!("source {}: {}", i, e)))?;
            let source_tempo = s.wind_tempo_params.unwrap_or_else(|| tempo.clone());
            source_tempo
                .validate()
                .map_err(|e| MapError::InvalidParams(format!("source {}: {}", i, e)))?;
            let gain = s.gain.unwrap_or(1.0);
            if !gain.is_finite() || gain < 0.0 {
                return Err(MapError::InvalidParams(format!(
                    "source {}: gain must be >= 0, got {}",
                    i, gain
                )));
            }
            sources.push(WindSource {
                position: HexCoord::new(s.r, s.c),
                params,
                tempo: source_tempo,
                gain,
            });
        }

        let clamped = doc
            .relief
            .iter()
            .flatten()
            .filter(|v| v.is_finite() && !(0.0..=1.0).contains(*v))
            .count();
        let positions: Vec<HexCoord> = sources.iter().map(|s| s.position).collect();
        let grid = TerrainGrid::from_relief(&doc.relief, &positions)?;
        if clamped > 0 {
            warn!(cells = clamped, map = %doc.name, "Relief outside [0, 1] clamped");
        }

        if sources.is_empty() {
            sources = grid
                .default_source_positions()
                .into_iter()
                .map(|pos| WindSource {
                    tempo: tempo.clone(),
                    ..WindSource::new(pos, wind_params.clone())
                })
                .collect();
        }
        for s in sources.iter().filter(|s| !grid.in_bounds(s.position)) {
            warn!(
                row = s.position.row,
                col = s.position.col,
                "Wind source outside grid, it will never emit"
            );
        }

        Ok(Self {
            name: doc.name,
            order: doc.order,
            completed: doc.completed,
            grid,
            spawn_point: doc.spawn_point,
            flag_position: doc.flag_position,
            sources,
            wind_params,
            tempo,
            global_wind_multiplier,
        })
    }

    /// Serialize to the canonical per-source document shape.
    pub fn to_json(&self) -> Result<String, MapError> {
        let doc = MapDocument {
            name: self.name.clone(),
            order: self.order,
            completed: self.completed,
            relief: self.grid.relief_matrix(),
            spawn_point: self.spawn_point,
            flag_position: self.flag_position,
            wind_sources: self
                .sources
                .iter()
                .map(|s| SourceDocument {
                    r: s.position.row,
                    c: s.position.col,
                    gain: Some(s.gain),
                    wind_params: Some(s.params.clone()),
                    wind_tempo_params: Some(s.tempo.clone()),
                })
                .collect(),
            wind_params: Some(self.wind_params.clone()),
            wind_tempo_params: Some(self.tempo.clone()),
            global_wind_multiplier: Some(self.global_wind_multiplier),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), MapError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
