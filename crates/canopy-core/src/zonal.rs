//! Zonal reduction: sum a per-cell quantity over the cells of a geometry.
//!
//! A [`ZonalReducer`] turns a geometry into a [`Cover`] (the cells whose
//! centres fall inside it); a cover can then reduce any number of layers.
//! [`GridReducer`] is the in-memory scanline implementation.

use std::ops::Range;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{ForestError, ReduceError};
use crate::geometry::{BBox, MultiPolygon};
use crate::grid::{Grid, GridSpec};

/// Metres per degree of latitude (and of longitude at the equator).
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Default cell budget per reduction.
pub const DEFAULT_MAX_CELLS: u64 = 1_000_000_000;

// ── Cell area ─────────────────────────────────────────────────────────────────

/// Area of each cell, used to turn cell counts into areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellArea {
    /// Every cell has the same area.
    Uniform(f64),
    /// Per-cell areas on the event grid.
    Raster(Grid<f64>),
}

impl CellArea {
    /// Uniform area from the grid's cell size, for projected grids.
    pub fn planar(spec: &GridSpec) -> Self {
        Self::Uniform((spec.cell_width() * spec.cell_height()).abs())
    }

    /// Latitude-corrected areas in m² for a grid whose coordinates are degrees
    /// of longitude (x) and latitude (y).
    pub fn geographic(spec: &GridSpec) -> Self {
        let dy_m = spec.cell_height().abs() * METRES_PER_DEGREE;
        let dx_deg = spec.cell_width().abs();
        let data = (0..spec.height)
            .flat_map(|r| {
                let (_, lat) = spec.cell_center(r, 0);
                let a = dx_deg * METRES_PER_DEGREE * lat.to_radians().cos() * dy_m;
                std::iter::repeat_n(a.max(0.0), spec.width)
            })
            .collect();
        Self::Raster(Grid { spec: *spec, data })
    }

    /// Check a per-cell area raster against the event grid.
    pub fn check(&self, spec: &GridSpec) -> Result<(), ForestError> {
        match self {
            CellArea::Uniform(_) => Ok(()),
            CellArea::Raster(g) => {
                g.check_shape("cell area")?;
                if g.spec != *spec {
                    return Err(ForestError::RasterMismatch {
                        layer: "cell area",
                        expected: *spec,
                        found: g.spec,
                    });
                }
                Ok(())
            }
        }
    }

    #[inline]
    pub fn at(&self, index: usize) -> f64 {
        match self {
            CellArea::Uniform(a) => *a,
            CellArea::Raster(g) => g.data[index],
        }
    }
}

// ── Cover ─────────────────────────────────────────────────────────────────────

/// Cells selected by a geometry, stored as row-major index runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cover {
    runs: Vec<Range<usize>>,
}

impl Cover {
    pub fn cell_count(&self) -> usize {
        self.runs.iter().map(|r| r.len()).sum()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.runs.iter().flat_map(|r| r.clone())
    }

    /// Sum `value` over the selected cells.
    pub fn sum(&self, value: impl Fn(usize) -> f64) -> f64 {
        self.indices().map(value).sum()
    }
}

// ── Reducer ───────────────────────────────────────────────────────────────────

/// Selects the cells of a grid covered by a geometry.
pub trait ZonalReducer: Send + Sync {
    fn cover(&self, spec: &GridSpec, zone: &MultiPolygon) -> Result<Cover, ReduceError>;

    /// One-shot sum of `value` over `zone`.
    fn reduce_sum(
        &self,
        spec: &GridSpec,
        zone: &MultiPolygon,
        value: &dyn Fn(usize) -> f64,
    ) -> Result<f64, ReduceError> {
        Ok(self.cover(spec, zone)?.sum(value))
    }
}

/// Scanline reducer over in-memory grids. A cell belongs to the zone when its
/// centre lies inside the geometry.
#[derive(Debug, Clone, Copy)]
pub struct GridReducer {
    /// Largest bounding-box cell count a single reduction may touch.
    pub max_cells: u64,
    /// Per-reduction deadline.
    pub timeout: Option<Duration>,
}

impl Default for GridReducer {
    fn default() -> Self {
        Self { max_cells: DEFAULT_MAX_CELLS, timeout: None }
    }
}

impl ZonalReducer for GridReducer {
    fn cover(&self, spec: &GridSpec, zone: &MultiPolygon) -> Result<Cover, ReduceError> {
        if zone.is_empty() {
            return Err(ReduceError::EmptyGeometry);
        }
        let bbox = zone.bbox();
        if !bbox.intersects(&extent(spec)) {
            return Err(ReduceError::OutsideExtent);
        }

        let (r0, r1) = spec.row_span(bbox.min_y, bbox.max_y);
        let (c0, c1) = spec.col_span(bbox.min_x, bbox.max_x);
        let cells = ((r1 - r0) * (c1 - c0)) as u64;
        if cells > self.max_cells {
            return Err(ReduceError::BudgetExceeded { cells, budget: self.max_cells });
        }

        let start = Instant::now();
        let mut runs = Vec::new();
        let mut spans: Vec<(usize, usize)> = Vec::new();
        for row in r0..r1 {
            if let Some(limit) = self.timeout {
                let elapsed = start.elapsed();
                if elapsed >= limit {
                    return Err(ReduceError::TimedOut { elapsed });
                }
            }
            let (_, y) = spec.cell_center(row, 0);
            spans.clear();
            for poly in zone.polygons() {
                let mut xs = row_crossings(poly, y);
                xs.sort_by(|a, b| a.total_cmp(b));
                for pair in xs.chunks_exact(2) {
                    let (lo, hi) = spec.col_span(pair[0], pair[1]);
                    if lo < hi {
                        spans.push((lo, hi));
                    }
                }
            }
            // Member polygons may overlap; merge so no cell is counted twice.
            spans.sort_unstable();
            let base = spec.index(row, 0);
            let mut current: Option<(usize, usize)> = None;
            for &(lo, hi) in &spans {
                current = match current {
                    Some((a, b)) if lo <= b => Some((a, b.max(hi))),
                    Some((a, b)) => {
                        runs.push(base + a..base + b);
                        Some((lo, hi))
                    }
                    None => Some((lo, hi)),
                };
            }
            if let Some((a, b)) = current {
                runs.push(base + a..base + b);
            }
        }
        Ok(Cover { runs })
    }
}

fn extent(spec: &GridSpec) -> BBox {
    BBox { min_x: spec.min_x, min_y: spec.min_y, max_x: spec.max_x, max_y: spec.max_y }
}

/// X coordinates where the horizontal line at `y` crosses the polygon's rings.
fn row_crossings(poly: &crate::geometry::Polygon, y: f64) -> Vec<f64> {
    let mut xs = Vec::new();
    let rings = std::iter::once(&poly.exterior).chain(poly.holes.iter());
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (ring[i], ring[j]);
            if (a.y > y) != (b.y > y) {
                xs.push((b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x);
            }
            j = i;
        }
    }
    xs
}
