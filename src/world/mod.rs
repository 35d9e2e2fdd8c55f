pub mod cell;
pub mod generation;
pub mod hex;
pub mod map;

use serde::{Deserialize, Serialize};

pub use cell::{CubeCoord, FractionalCube, HexCoord, TerrainCell, WindVector};
pub use map::{LevelMap, MapError};

/// Downstream (westward) neighbor offsets `(d_row, d_col)` for even rows in odd-r layout.
const EVEN_ROW_DOWNSTREAM: [(i32, i32); 3] = [
    (0, -1),  // West
    (-1, -1), // Northwest
    (1, -1),  // Southwest
];

/// Downstream neighbor offsets for odd rows, which are shifted half a hex right.
const ODD_ROW_DOWNSTREAM: [(i32, i32); 3] = [
    (0, -1), // West
    (-1, 0), // Northwest
    (1, 0),  // Southwest
];

/// Every n-th row carries a source on its last column when a map names none.
const DEFAULT_SOURCE_ROW_STRIDE: usize = 4;

/// Rectangular hex terrain, stored row-major. Its shape is fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    rows: usize,
    cols: usize,
    cells: Vec<TerrainCell>,
}

impl TerrainGrid {
    /// Build a grid whose relief comes from `relief(row, col)`, clamped to `[0, 1]`.
    ///
    /// Sources follow the default placement (every 4th row, last column).
    pub fn from_fn(rows: usize, cols: usize, mut relief: impl FnMut(usize, usize) -> f64) -> Self {
        if rows == 0 || cols == 0 {
            return Self::empty();
        }
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                cells.push(TerrainCell::new(clamp_relief(relief(r, c))));
            }
        }
        let mut grid = Self { rows, cols, cells };
        let defaults = grid.default_source_positions();
        grid.set_sources(&defaults);
        grid
    }

    /// Import a relief matrix. All wind starts calm. An empty `sources` list
    /// falls back to the default source placement.
    pub fn from_relief(matrix: &[Vec<f64>], sources: &[HexCoord]) -> Result<Self, MapError> {
        let rows = matrix.len();
        let cols = matrix.first().map_or(0, Vec::len);
        if rows > 0 && cols == 0 {
            return Err(MapError::EmptyRow { row: 0 });
        }
        for (r, row) in matrix.iter().enumerate() {
            if row.len() != cols {
                return Err(MapError::Ragged {
                    row: r,
                    expected: cols,
                    found: row.len(),
                });
            }
            if let Some(c) = row.iter().position(|v| !v.is_finite()) {
                return Err(MapError::NonFiniteRelief { row: r, col: c });
            }
        }
        if rows == 0 {
            return Ok(Self::empty());
        }

        let cells = matrix
            .iter()
            .flat_map(|row| row.iter().map(|&v| TerrainCell::new(clamp_relief(v))))
            .collect();
        let mut grid = Self { rows, cols, cells };
        if sources.is_empty() {
            let defaults = grid.default_source_positions();
            grid.set_sources(&defaults);
        } else {
            grid.set_sources(sources);
        }
        Ok(grid)
    }

    pub fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            cells: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Cell storage matches the declared shape. Only a decoded grid can fail this.
    pub fn is_consistent(&self) -> bool {
        self.cells.len() == self.rows * self.cols
    }

    pub fn in_bounds(&self, hex: HexCoord) -> bool {
        hex.row >= 0
            && hex.col >= 0
            && (hex.row as usize) < self.rows
            && (hex.col as usize) < self.cols
    }

    /// Row-major index of an in-bounds cell.
    pub fn index_of(&self, hex: HexCoord) -> Option<usize> {
        if self.in_bounds(hex) {
            Some(hex.row as usize * self.cols + hex.col as usize)
        } else {
            None
        }
    }

    pub fn coord_of(&self, index: usize) -> HexCoord {
        HexCoord::new((index / self.cols) as i32, (index % self.cols) as i32)
    }

    pub fn cell_at(&self, row: i32, col: i32) -> Option<&TerrainCell> {
        self.index_of(HexCoord::new(row, col)).map(|i| &self.cells[i])
    }

    pub fn cell(&self, hex: HexCoord) -> Option<&TerrainCell> {
        self.index_of(hex).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, hex: HexCoord) -> Option<&mut TerrainCell> {
        self.index_of(hex).map(move |i| &mut self.cells[i])
    }

    /// Cell under a pixel position, if that position lands on the grid.
    pub fn cell_at_pixel(&self, x: f64, y: f64) -> Option<&TerrainCell> {
        self.cell(hex::pixel_to_offset(x, y))
    }

    /// Wind under a pixel position; calm when off-grid.
    pub fn wind_at_pixel(&self, x: f64, y: f64) -> WindVector {
        self.cell_at_pixel(x, y)
            .map(|c| c.wind)
            .unwrap_or(WindVector::CALM)
    }

    pub fn cells(&self) -> &[TerrainCell] {
        &self.cells
    }

    /// Up to three in-bounds neighbors on the downstream (lower column) side.
    pub fn neighbors_downstream(&self, hex: HexCoord) -> impl Iterator<Item = HexCoord> + '_ {
        self.downstream_cells(hex).map(|(n, _)| n)
    }

    /// Downstream neighbors with their row-major indices, in W, NW, SW order.
    pub fn downstream_cells(
        &self,
        hex: HexCoord,
    ) -> impl Iterator<Item = (HexCoord, usize)> + '_ {
        let offsets = if hex.is_odd_row() {
            &ODD_ROW_DOWNSTREAM
        } else {
            &EVEN_ROW_DOWNSTREAM
        };
        offsets.iter().filter_map(move |&(dr, dc)| {
            let n = HexCoord::new(hex.row.checked_add(dr)?, hex.col.checked_add(dc)?);
            self.index_of(n).map(|i| (n, i))
        })
    }

    /// Every 4th row's last column.
    pub fn default_source_positions(&self) -> Vec<HexCoord> {
        if self.cols == 0 {
            return Vec::new();
        }
        (0..self.rows)
            .step_by(DEFAULT_SOURCE_ROW_STRIDE)
            .map(|r| HexCoord::new(r as i32, self.cols as i32 - 1))
            .collect()
    }

    /// Replace the source flags. Out-of-bounds positions are ignored.
    pub fn set_sources(&mut self, sources: &[HexCoord]) {
        for cell in &mut self.cells {
            cell.is_source = false;
        }
        for &pos in sources {
            if let Some(cell) = self.cell_mut(pos) {
                cell.is_source = true;
            }
        }
    }

    pub fn source_positions(&self) -> Vec<HexCoord> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_source)
            .map(|(i, _)| self.coord_of(i))
            .collect()
    }

    pub fn clear_wind(&mut self) {
        for cell in &mut self.cells {
            cell.wind = WindVector::CALM;
        }
    }

    /// Replace every cell's wind with the row-major `next` field.
    ///
    /// `next` must have exactly one entry per cell.
    pub(crate) fn commit_wind(&mut self, next: &[WindVector]) {
        debug_assert_eq!(next.len(), self.cells.len());
        for (cell, wind) in self.cells.iter_mut().zip(next) {
            cell.wind = *wind;
        }
    }

    pub(crate) fn set_wind_at(&mut self, index: usize, wind: WindVector) {
        self.cells[index].wind = wind;
    }

    pub(crate) fn wind_at(&self, index: usize) -> WindVector {
        self.cells[index].wind
    }

    pub(crate) fn relief_at(&self, index: usize) -> f64 {
        self.cells[index].relief
    }

    /// Relief as a row-major matrix, the shape map files use.
    pub fn relief_matrix(&self) -> Vec<Vec<f64>> {
        self.cells
            .chunks(self.cols.max(1))
            .map(|row| row.iter().map(|c| c.relief).collect())
            .collect()
    }
}

fn clamp_relief(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(rows: usize, cols: usize) -> TerrainGrid {
        TerrainGrid::from_fn(rows, cols, |_, _| 0.5)
    }

    #[test]
    fn grid_is_row_major() {
        let grid = TerrainGrid::from_fn(3, 4, |r, c| (r * 4 + c) as f64 / 100.0);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.cell_at(2, 1).unwrap().relief, 0.09);
        assert_eq!(grid.index_of(HexCoord::new(1, 2)), Some(6));
        assert_eq!(grid.coord_of(6), HexCoord::new(1, 2));
    }

    #[test]
    fn relief_is_clamped() {
        let grid = TerrainGrid::from_fn(1, 2, |_, c| if c == 0 { -3.0 } else { 4.0 });
        assert_eq!(grid.cell_at(0, 0).unwrap().relief, 0.0);
        assert_eq!(grid.cell_at(0, 1).unwrap().relief, 1.0);
    }

    #[test]
    fn out_of_bounds_is_none() {
        let grid = flat(3, 3);
        assert!(grid.cell_at(-1, 0).is_none());
        assert!(grid.cell_at(0, 3).is_none());
        assert!(grid.cell_at(3, 0).is_none());
        assert!(grid.cell_at(2, 2).is_some());
        assert!(grid.cell_at_pixel(-500.0, -500.0).is_none());
        assert!(grid.wind_at_pixel(1e6, 1e6).is_calm());
    }

    #[test]
    fn default_sources_every_fourth_row_last_column() {
        let grid = flat(9, 5);
        assert_eq!(
            grid.source_positions(),
            vec![HexCoord::new(0, 4), HexCoord::new(4, 4), HexCoord::new(8, 4)]
        );
    }

    #[test]
    fn downstream_neighbors_even_row() {
        let grid = flat(5, 5);
        let n: Vec<_> = grid.neighbors_downstream(HexCoord::new(2, 3)).collect();
        assert_eq!(
            n,
            vec![HexCoord::new(2, 2), HexCoord::new(1, 2), HexCoord::new(3, 2)]
        );
    }

    #[test]
    fn downstream_neighbors_odd_row() {
        let grid = flat(5, 5);
        let n: Vec<_> = grid.neighbors_downstream(HexCoord::new(1, 3)).collect();
        assert_eq!(
            n,
            vec![HexCoord::new(1, 2), HexCoord::new(0, 3), HexCoord::new(2, 3)]
        );
    }

    #[test]
    fn downstream_cells_carry_their_indices() {
        let grid = flat(5, 5);
        for row in 0..5 {
            for col in 0..5 {
                for (n, i) in grid.downstream_cells(HexCoord::new(row, col)) {
                    assert_eq!(grid.index_of(n), Some(i));
                }
            }
        }
        assert_eq!(grid.downstream_cells(HexCoord::new(i32::MIN, i32::MIN)).count(), 0);
    }

    #[test]
    fn downstream_neighbors_filtered_at_edges() {
        let grid = flat(5, 5);
        let corner: Vec<_> = grid.neighbors_downstream(HexCoord::new(0, 4)).collect();
        assert_eq!(corner, vec![HexCoord::new(0, 3), HexCoord::new(1, 3)]);
        assert_eq!(grid.neighbors_downstream(HexCoord::new(2, 0)).count(), 0);
        // Odd row at column 0 still reaches up and down
        assert_eq!(grid.neighbors_downstream(HexCoord::new(1, 0)).count(), 2);
    }

    #[test]
    fn from_relief_resets_wind_and_places_sources() {
        let matrix = vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]];
        let grid = TerrainGrid::from_relief(&matrix, &[HexCoord::new(1, 0)]).unwrap();
        assert_eq!(grid.source_positions(), vec![HexCoord::new(1, 0)]);
        assert!(grid.cells().iter().all(|c| c.wind.is_calm()));
        assert_eq!(grid.relief_matrix(), matrix);
    }

    #[test]
    fn from_relief_without_sources_uses_defaults() {
        let matrix = vec![vec![0.5; 4]; 6];
        let grid = TerrainGrid::from_relief(&matrix, &[]).unwrap();
        assert_eq!(
            grid.source_positions(),
            vec![HexCoord::new(0, 3), HexCoord::new(4, 3)]
        );
    }

    #[test]
    fn from_relief_ignores_out_of_bounds_sources() {
        let matrix = vec![vec![0.5; 3]; 3];
        let sources = [HexCoord::new(10, 10), HexCoord::new(2, 2)];
        let grid = TerrainGrid::from_relief(&matrix, &sources).unwrap();
        assert_eq!(grid.source_positions(), vec![HexCoord::new(2, 2)]);
    }

    #[test]
    fn ragged_matrix_rejected() {
        let matrix = vec![vec![0.5; 3], vec![0.5; 2]];
        let err = TerrainGrid::from_relief(&matrix, &[]).unwrap_err();
        assert!(matches!(
            err,
            MapError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn non_finite_relief_rejected() {
        let matrix = vec![vec![0.5, f64::NAN]];
        let err = TerrainGrid::from_relief(&matrix, &[]).unwrap_err();
        assert!(matches!(err, MapError::NonFiniteRelief { row: 0, col: 1 }));
    }

    #[test]
    fn empty_inputs_give_empty_grid() {
        assert!(TerrainGrid::from_fn(0, 5, |_, _| 0.5).is_empty());
        assert!(TerrainGrid::from_relief(&[], &[]).unwrap().is_empty());
        assert!(TerrainGrid::empty().neighbors_downstream(HexCoord::new(0, 0)).next().is_none());
    }
}
