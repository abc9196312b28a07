//! Regular raster grid with optional cells, row-major, rows Y-ascending.
//! "No data" is a real absence (`None`), never a sentinel number.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Geometry of a grid: origin, step sizes, and resolution. A grid stores
/// `(resolution + 1)²` nodes so that node positions close exactly:
/// `x = min_x + col·step_x`, `y = min_y + row·step_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridInfo {
    pub min_x: f64,
    pub min_y: f64,
    pub step_x: f64,
    pub step_y: f64,
    pub resolution: usize,
}

impl GridInfo {
    /// Cover the extents `(min_x..max_x, min_y..max_y)` with `resolution` steps.
    pub fn from_extents(min_x: f64, max_x: f64, min_y: f64, max_y: f64, resolution: usize) -> Self {
        let resolution = resolution.max(1);
        Self {
            min_x,
            min_y,
            step_x: (max_x - min_x) / resolution as f64,
            step_y: (max_y - min_y) / resolution as f64,
            resolution,
        }
    }

    /// Nodes per side.
    #[inline]
    pub fn side(&self) -> usize {
        self.resolution + 1
    }

    #[inline]
    pub fn x(&self, col: usize) -> f64 {
        self.min_x + col as f64 * self.step_x
    }

    #[inline]
    pub fn y(&self, row: usize) -> f64 {
        self.min_y + row as f64 * self.step_y
    }

    pub fn node(&self, row: usize, col: usize) -> Point {
        Point::new(self.x(col), self.y(row))
    }

    /// Row/col of the node nearest to `(x, y)`, if inside the grid.
    pub fn nearest_node(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if self.step_x == 0.0 || self.step_y == 0.0 {
            return None;
        }
        let col = ((x - self.min_x) / self.step_x).round();
        let row = ((y - self.min_y) / self.step_y).round();
        let last = self.resolution as f64;
        if col < 0.0 || row < 0.0 || col > last || row > last {
            return None;
        }
        Some((row as usize, col as usize))
    }
}

/// Dense optional-valued raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarGrid {
    pub info: GridInfo,
    values: Vec<Option<f64>>,
}

impl ScalarGrid {
    pub fn empty(info: GridInfo) -> Self {
        let side = info.side();
        Self {
            info,
            values: vec![None; side * side],
        }
    }

    /// Build from per-row vectors, row 0 first. Row lengths must equal `side`.
    pub fn from_rows(info: GridInfo, rows: Vec<Vec<Option<f64>>>) -> Self {
        debug_assert_eq!(rows.len(), info.side());
        let mut values = Vec::with_capacity(info.side() * info.side());
        for row in rows {
            debug_assert_eq!(row.len(), info.side());
            values.extend(row);
        }
        Self { info, values }
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.values[row * self.info.side() + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, v: Option<f64>) {
        let side = self.info.side();
        self.values[row * side + col] = v;
    }

    /// Value at the node nearest to the world position `(x, y)`.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        let (row, col) = self.info.nearest_node(x, y)?;
        self.value(row, col)
    }

    /// Defined nodes in fixed row-major order, as `(row, col, value)`.
    pub fn defined(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let side = self.info.side();
        self.values
            .iter()
            .enumerate()
            .filter_map(move |(i, v)| v.map(|v| (i / side, i % side, v)))
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn same_geometry(&self, other: &ScalarGrid) -> bool {
        self.info == other.info
    }

    /// A copy with every defined value rounded to one decimal place, the
    /// exposure precision of the published contract.
    pub fn rounded_tenths(&self) -> ScalarGrid {
        ScalarGrid {
            info: self.info,
            values: self.values.iter().map(|v| v.map(round1)).collect(),
        }
    }
}

/// Round to one decimal place.
#[inline]
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
