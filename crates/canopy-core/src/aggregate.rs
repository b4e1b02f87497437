//! Per-zone, per-year forest area quantities.

use serde::{Deserialize, Serialize};

use crate::error::{ForestError, ReduceError};
use crate::events::EventStack;
use crate::geometry::MultiPolygon;
use crate::mask::ForestMask;
use crate::recurrence::YearSeries;
use crate::zonal::{CellArea, Cover, ZonalReducer};

/// The four area sums for one (zone, year).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneStats {
    /// Forest area in the year's mask.
    pub total_forest: f64,
    /// Area whose loss event falls in the year, regardless of the mask.
    pub forest_loss: f64,
    /// Area whose gain event falls in the year, regardless of the mask.
    pub forest_gain: f64,
    /// Forest area in the baseline mask. Identical for every year.
    pub total_forest_base: f64,
}

/// Anything that can produce [`ZoneStats`] for a zone and a year.
pub trait ZoneStatsSource: Sync {
    fn zone_stats(&self, year: i32, zone: &MultiPolygon) -> Result<ZoneStats, ReduceError>;

    /// Stats for each of `years` over one zone, one result per year in order.
    ///
    /// Sources that can share per-zone work across years override this.
    fn zone_series(&self, years: &[i32], zone: &MultiPolygon) -> Vec<Result<ZoneStats, ReduceError>> {
        years.iter().map(|&year| self.zone_stats(year, zone)).collect()
    }
}

/// Reduces the year series and event rasters over zones.
///
/// Holds only shared borrows, so one aggregator can serve every worker.
pub struct ZonalAggregator<'a, R: ZonalReducer> {
    events: &'a EventStack,
    series: &'a YearSeries,
    area: &'a CellArea,
    reducer: R,
}

impl<'a, R: ZonalReducer> ZonalAggregator<'a, R> {
    /// Fails if the area raster does not sit on the event grid.
    pub fn new(
        events: &'a EventStack,
        series: &'a YearSeries,
        area: &'a CellArea,
        reducer: R,
    ) -> Result<Self, ForestError> {
        area.check(events.spec())?;
        Ok(Self { events, series, area, reducer })
    }

    pub fn series(&self) -> &YearSeries {
        self.series
    }

    fn weighted(&self, cover: &Cover, hit: impl Fn(usize) -> bool) -> f64 {
        cover.sum(|i| if hit(i) { self.area.at(i) } else { 0.0 })
    }

    fn baseline_area(&self, cover: &Cover) -> f64 {
        let base = self.series.baseline();
        self.weighted(cover, |i| base.is_forest(i))
    }

    fn mask(&self, year: i32) -> Result<&ForestMask, ReduceError> {
        self.series.get(year).ok_or(ReduceError::YearOutOfRange {
            year,
            first: self.series.first_year(),
            last: self.series.last_year(),
        })
    }

    /// The three per-year sums over an already computed cover.
    fn year_stats(&self, cover: &Cover, base_area: f64, year: i32) -> Result<ZoneStats, ReduceError> {
        let mask = self.mask(year)?;
        Ok(ZoneStats {
            total_forest: self.weighted(cover, |i| mask.is_forest(i)),
            forest_loss: self.weighted(cover, |i| self.events.loss().at(i, year)),
            forest_gain: self.weighted(cover, |i| self.events.gain().at(i, year)),
            total_forest_base: base_area,
        })
    }
}

impl<R: ZonalReducer> ZoneStatsSource for ZonalAggregator<'_, R> {
    fn zone_stats(&self, year: i32, zone: &MultiPolygon) -> Result<ZoneStats, ReduceError> {
        self.mask(year)?;
        let cover = self.reducer.cover(self.events.spec(), zone)?;
        self.year_stats(&cover, self.baseline_area(&cover), year)
    }

    /// One cover and one baseline sum per zone, shared by every year.
    fn zone_series(&self, years: &[i32], zone: &MultiPolygon) -> Vec<Result<ZoneStats, ReduceError>> {
        let cover = match self.reducer.cover(self.events.spec(), zone) {
            Ok(cover) => cover,
            Err(e) => return years.iter().map(|_| Err(e.clone())).collect(),
        };
        let base_area = self.baseline_area(&cover);
        years.iter().map(|&year| self.year_stats(&cover, base_area, year)).collect()
    }
}
