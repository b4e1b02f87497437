use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ForestError;

/// Geometry of a regular raster grid in planar (projected) coordinates.
///
/// Row 0 is the southern edge (`min_y`), column 0 the western edge (`min_x`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl GridSpec {
    pub fn new(width: usize, height: usize, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self { width, height, min_x, max_x, min_y, max_y }
    }

    /// Grid whose cells are 1×1 units with the origin at (0, 0).
    pub fn unit(width: usize, height: usize) -> Self {
        Self::new(width, height, 0.0, width as f64, 0.0, height as f64)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn cell_width(&self) -> f64 {
        (self.max_x - self.min_x) / self.width as f64
    }

    #[inline]
    pub fn cell_height(&self) -> f64 {
        (self.max_y - self.min_y) / self.height as f64
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Planar coordinates of the centre of cell (row, col).
    #[inline]
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.min_x + (col as f64 + 0.5) * self.cell_width(),
            self.min_y + (row as f64 + 0.5) * self.cell_height(),
        )
    }

    /// Index range `[lo, hi)` of the columns whose centres lie in `[x0, x1]`.
    pub fn col_span(&self, x0: f64, x1: f64) -> (usize, usize) {
        span(x0, x1, self.min_x, self.cell_width(), self.width)
    }

    /// Index range `[lo, hi)` of the rows whose centres lie in `[y0, y1]`.
    pub fn row_span(&self, y0: f64, y1: f64) -> (usize, usize) {
        span(y0, y1, self.min_y, self.cell_height(), self.height)
    }
}

/// Cells `i` with `origin + (i + 0.5) * step` in `[lo, hi]`, clamped to `[0, n)`.
fn span(lo: f64, hi: f64, origin: f64, step: f64, n: usize) -> (usize, usize) {
    if n == 0 || step <= 0.0 || hi < lo {
        return (0, 0);
    }
    let first = ((lo - origin) / step - 0.5).ceil().max(0.0);
    let last = ((hi - origin) / step - 0.5).floor();
    if last < 0.0 || first >= n as f64 {
        return (0, 0);
    }
    let first = first as usize;
    let end = (last.min(n as f64 - 1.0) as usize) + 1;
    if first >= end { (0, 0) } else { (first, end) }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} [{}, {}]x[{}, {}]",
            self.width, self.height, self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// A row-major raster of `T` over a [`GridSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    pub spec: GridSpec,
    /// Row-major cell values, `spec.width * spec.height` long.
    pub data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid filled with the given value.
    pub fn new(spec: GridSpec, fill: T) -> Self {
        Self { data: vec![fill; spec.len()], spec }
    }
}

impl<T> Grid<T> {
    /// Wrap existing row-major data, checking its length against the grid.
    pub fn from_vec(spec: GridSpec, data: Vec<T>) -> Result<Self, ForestError> {
        let grid = Self { spec, data };
        grid.check_shape("grid")?;
        Ok(grid)
    }

    /// Verify that `data` covers the grid exactly. Deserialized grids are not
    /// checked until this is called.
    pub fn check_shape(&self, layer: &'static str) -> Result<(), ForestError> {
        if self.data.len() != self.spec.len() {
            return Err(ForestError::RasterShape {
                layer,
                len: self.data.len(),
                expected: self.spec.len(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[self.spec.index(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        let i = self.spec.index(row, col);
        self.data[i] = val;
    }

    /// Apply `f` to every cell, keeping the grid geometry.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Grid<U> {
        Grid { spec: self.spec, data: self.data.iter().map(f).collect() }
    }
}
