//! Error types for the canopy-core crate.
//!
//! `ForestError` covers failures that abort a run (bad configuration,
//! inconsistent inputs). `ReduceError` covers failures of a single zonal
//! reduction; the batch processor records those per (region, year) and keeps
//! going.

use std::time::Duration;

use crate::grid::GridSpec;

/// Fatal errors raised before or while building the year series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForestError {
    /// Returned when the first year of the window comes after the last.
    #[error("invalid year range: min year {min} is after max year {max}")]
    InvalidRange {
        /// First requested year offset.
        min: i32,
        /// Last requested year offset.
        max: i32,
    },

    /// Returned when two event rasters do not share grid geometry.
    #[error("{layer} raster grid {found} does not match establishment grid {expected}")]
    RasterMismatch {
        /// Name of the offending raster.
        layer: &'static str,
        /// Grid of the establishment raster.
        expected: GridSpec,
        /// Grid of the offending raster.
        found: GridSpec,
    },

    /// Returned when a raster's data length disagrees with its declared grid.
    #[error("{layer} raster has {len} cells but its grid declares {expected}")]
    RasterShape {
        /// Name of the offending raster.
        layer: &'static str,
        /// Number of values supplied.
        len: usize,
        /// `width * height` of the declared grid.
        expected: usize,
    },

    /// Returned when a percentage is requested against a zero baseline.
    #[error("percentage undefined: baseline forest area is zero")]
    DivisionUndefined,
}

/// Per-record failure of a zonal reduction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReduceError {
    /// The geometry's bounding box does not overlap the raster extent.
    #[error("geometry does not intersect the raster extent")]
    OutsideExtent,

    /// The geometry has no rings or fewer than three vertices.
    #[error("geometry is empty")]
    EmptyGeometry,

    /// The reduction would touch more cells than the configured budget.
    #[error("reduction needs {cells} cells, budget is {budget}")]
    BudgetExceeded {
        /// Candidate cells under the geometry's bounding box.
        cells: u64,
        /// Configured maximum.
        budget: u64,
    },

    /// The reduction ran past its deadline.
    #[error("reduction timed out after {elapsed:?}")]
    TimedOut {
        /// Time spent before giving up.
        elapsed: Duration,
    },

    /// The requested year has no mask in the series.
    #[error("year offset {year} is outside the series [{first}, {last}]")]
    YearOutOfRange {
        /// Requested year offset.
        year: i32,
        /// First year in the series (the baseline).
        first: i32,
        /// Last year in the series.
        last: i32,
    },
}

/// Errors from the control-region shuffler.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShuffleError {
    /// The base region has no area to place polygons in.
    #[error("base region is empty")]
    EmptyBase,

    /// Rejection sampling never hit the base region.
    #[error("no point inside the base region after {draws} draws")]
    NoInteriorPoint {
        /// Draws attempted.
        draws: usize,
    },
}

impl ReduceError {
    /// Whether repeating the same reduction could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReduceError::TimedOut { .. })
    }
}
