use serde::{Deserialize, Serialize};

// === Coordinates ===

/// Offset (odd-r) hex coordinate. Serialized as `{ "r": .., "c": .. }` to match map files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexCoord {
    #[serde(rename = "r")]
    pub row: i32,
    #[serde(rename = "c")]
    pub col: i32,
}

impl HexCoord {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn is_odd_row(self) -> bool {
        self.row & 1 == 1
    }
}

/// Integer cube coordinate, `x + y + z == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Cube coordinate before rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionalCube {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// === Wind ===

/// Per-cell wind state.
///
/// `mass == 0` means calm; `direction` and `celerity` carry no meaning then.
/// `origin` indexes the wind source whose parameters produced this gust, so
/// propagation keeps using them downstream. `None` falls back to the
/// grid-wide parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindVector {
    pub mass: f64,
    pub celerity: f64,
    /// Radians, `atan2(d_row, d_col)` convention: `PI` blows toward lower columns.
    pub direction: f64,
    #[serde(default)]
    pub origin: Option<usize>,
}

impl WindVector {
    pub const CALM: WindVector = WindVector {
        mass: 0.0,
        celerity: 0.0,
        direction: 0.0,
        origin: None,
    };

    pub fn is_calm(&self) -> bool {
        self.mass <= 0.0
    }

    /// Combine another gust arriving in the same cell by summing the
    /// `(mass cos, mass sin)` vectors. Masses add; the angle is the resultant's.
    /// The origin of the heavier contribution is kept.
    pub fn merge(&mut self, incoming: WindVector) {
        if self.is_calm() {
            *self = incoming;
            return;
        }
        let total = self.mass + incoming.mass;
        let sin = self.mass * self.direction.sin() + incoming.mass * incoming.direction.sin();
        let cos = self.mass * self.direction.cos() + incoming.mass * incoming.direction.cos();
        if incoming.mass > self.mass {
            self.origin = incoming.origin;
        }
        self.direction = sin.atan2(cos);
        self.mass = total;
        self.celerity = incoming.celerity;
    }

    /// Dynamic pressure shown by the hex inspector (`0.5 * mass^2`).
    pub fn pressure(&self) -> f64 {
        0.5 * self.mass * self.mass
    }
}

impl Default for WindVector {
    fn default() -> Self {
        WindVector::CALM
    }
}

// === Cell ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainCell {
    /// Height/roughness in `[0, 1]`.
    pub relief: f64,
    pub wind: WindVector,
    pub is_source: bool,
}

impl TerrainCell {
    pub fn new(relief: f64) -> Self {
        Self {
            relief,
            wind: WindVector::CALM,
            is_source: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn gust(mass: f64, direction: f64, origin: Option<usize>) -> WindVector {
        WindVector {
            mass,
            celerity: 0.5,
            direction,
            origin,
        }
    }

    #[test]
    fn merge_into_calm_takes_incoming() {
        let mut w = WindVector::CALM;
        w.merge(gust(0.7, PI, Some(2)));
        assert_eq!(w, gust(0.7, PI, Some(2)));
    }

    #[test]
    fn merge_sums_masses() {
        let mut w = gust(0.4, PI, Some(0));
        w.merge(gust(0.9, PI - 0.5, Some(1)));
        assert!((w.mass - 1.3).abs() < 1e-12);
        assert_eq!(w.origin, Some(1));
    }

    #[test]
    fn merge_direction_is_resultant_angle() {
        let mut w = gust(1.0, 0.0, None);
        w.merge(gust(1.0, FRAC_PI_2, None));
        assert!((w.direction - PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn hex_coord_serializes_as_r_c() {
        let json = serde_json::to_string(&HexCoord::new(3, 7)).unwrap();
        assert_eq!(json, r#"{"r":3,"c":7}"#);
    }

    #[test]
    fn odd_row_detection_handles_negatives() {
        assert!(HexCoord::new(-1, 0).is_odd_row());
        assert!(!HexCoord::new(-2, 0).is_odd_row());
        assert!(HexCoord::new(5, 0).is_odd_row());
    }
}
