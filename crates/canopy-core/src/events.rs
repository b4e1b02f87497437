//! Year-of-event rasters and the year window they are read over.
//!
//! All years inside the crate are offsets from a reference [`Epoch`]
//! (1970 in the reference data). Calendar years only appear at the edges:
//! configuration on the way in, projection on the way out.

use serde::{Deserialize, Serialize};

use crate::error::ForestError;
use crate::grid::{Grid, GridSpec};

/// Internal marker for "no event recorded at this cell". Lies below every
/// representable year offset, and every year predicate treats it as absent.
pub const NO_EVENT: i32 = i32::MIN;

// ── Epoch ─────────────────────────────────────────────────────────────────────

/// Reference calendar year that year offsets count from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch(pub i32);

impl Default for Epoch {
    fn default() -> Self {
        Self(1970)
    }
}

impl Epoch {
    #[inline]
    pub fn to_offset(self, calendar_year: i32) -> i32 {
        calendar_year - self.0
    }

    #[inline]
    pub fn to_calendar(self, offset: i32) -> i32 {
        offset + self.0
    }
}

// ── Year range ────────────────────────────────────────────────────────────────

/// Inclusive analysis window `[min, max]` in year offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    min: i32,
    max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Result<Self, ForestError> {
        if min > max {
            return Err(ForestError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Build a range from calendar years.
    pub fn from_calendar(epoch: Epoch, min_year: i32, max_year: i32) -> Result<Self, ForestError> {
        Self::new(epoch.to_offset(min_year), epoch.to_offset(max_year))
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    /// The year whose mask is reconstructed directly from the events.
    pub fn baseline(&self) -> i32 {
        self.min - 1
    }

    /// Analysis years, ascending. Excludes the baseline.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.min..=self.max
    }

    /// Number of analysis years.
    pub fn year_count(&self) -> usize {
        (self.max - self.min) as usize + 1
    }
}

// ── Event raster ──────────────────────────────────────────────────────────────

/// A raster of event years with absence normalized to [`NO_EVENT`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventRaster {
    grid: Grid<i32>,
}

impl EventRaster {
    /// Normalize a source raster: every cell equal to `nodata` becomes "no
    /// event". Pass `None` when the source has no absence encoding.
    ///
    /// The reference loss and gain rasters encode absence as 0, so 0 cannot
    /// be used as a real year offset when `nodata = Some(0)`.
    pub fn normalized(mut grid: Grid<i32>, nodata: Option<i32>) -> Self {
        if let Some(fill) = nodata {
            for v in &mut grid.data {
                if *v == fill {
                    *v = NO_EVENT;
                }
            }
        }
        Self { grid }
    }

    /// Raster where no cell has an event.
    pub fn empty(spec: GridSpec) -> Self {
        Self { grid: Grid::new(spec, NO_EVENT) }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.grid.spec
    }

    pub fn len(&self) -> usize {
        self.grid.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.data.is_empty()
    }

    /// Event year at a cell, if any.
    #[inline]
    pub fn year(&self, index: usize) -> Option<i32> {
        match self.grid.data[index] {
            NO_EVENT => None,
            y => Some(y),
        }
    }

    /// Event happened exactly in `year`.
    #[inline]
    pub fn at(&self, index: usize, year: i32) -> bool {
        self.year(index) == Some(year)
    }

    /// Event happened strictly before `year`.
    #[inline]
    pub fn before(&self, index: usize, year: i32) -> bool {
        self.year(index).is_some_and(|y| y < year)
    }

    /// Event happened strictly after `year`.
    #[inline]
    pub fn after(&self, index: usize, year: i32) -> bool {
        self.year(index).is_some_and(|y| y > year)
    }

    /// Number of cells carrying an event.
    pub fn event_count(&self) -> usize {
        self.grid.data.iter().filter(|&&v| v != NO_EVENT).count()
    }

    fn check_shape(&self, layer: &'static str) -> Result<(), ForestError> {
        self.grid.check_shape(layer)
    }
}

// ── Event stack ───────────────────────────────────────────────────────────────

/// The three event rasters, validated to share one grid.
#[derive(Debug, Clone)]
pub struct EventStack {
    establishment: EventRaster,
    gain: EventRaster,
    loss: EventRaster,
}

impl EventStack {
    pub fn new(
        establishment: EventRaster,
        gain: EventRaster,
        loss: EventRaster,
    ) -> Result<Self, ForestError> {
        establishment.check_shape("establishment")?;
        gain.check_shape("gain")?;
        loss.check_shape("loss")?;
        let expected = *establishment.spec();
        for (layer, raster) in [("gain", &gain), ("loss", &loss)] {
            if *raster.spec() != expected {
                return Err(ForestError::RasterMismatch {
                    layer,
                    expected,
                    found: *raster.spec(),
                });
            }
        }
        Ok(Self { establishment, gain, loss })
    }

    pub fn spec(&self) -> &GridSpec {
        self.establishment.spec()
    }

    pub fn establishment(&self) -> &EventRaster {
        &self.establishment
    }

    pub fn gain(&self) -> &EventRaster {
        &self.gain
    }

    pub fn loss(&self) -> &EventRaster {
        &self.loss
    }
}
