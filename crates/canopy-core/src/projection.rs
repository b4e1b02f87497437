//! Projection of batch records onto flat, exportable rows.

use std::fmt;

use serde::Serialize;

use crate::batch::{StatOutcome, YearlyRegionStat};
use crate::events::Epoch;
use crate::region::{Region, RegionKind};

/// Row status, written to the `status` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowStatus {
    Ok,
    ZeroBaseline,
    Failed(String),
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Ok => f.write_str("ok"),
            RowStatus::ZeroBaseline => f.write_str("zero_baseline"),
            RowStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One exported row. `None` values are written as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    /// Calendar year.
    pub year: i32,
    pub kind: RegionKind,
    pub name: String,
    pub code: Option<String>,
    pub buffer_size: Option<f64>,
    pub total_forest: Option<f64>,
    pub forest_loss: Option<f64>,
    pub forest_gain: Option<f64>,
    pub total_forest_base: Option<f64>,
    pub percent_forest_loss: Option<f64>,
    pub percent_forest_gain: Option<f64>,
    pub status: RowStatus,
}

/// The two identity column names for a region kind.
pub fn identity_columns(kind: RegionKind) -> [&'static str; 2] {
    match kind {
        RegionKind::Village => ["village", "buffer_size"],
        RegionKind::VillageTract => ["village_tract", "village_tract_PCODE"],
        RegionKind::Township => ["township", "township_PCODE"],
        RegionKind::State => ["state", "state_PCODE"],
    }
}

impl FlatRecord {
    /// Values for [`identity_columns`], in the same order.
    pub fn identity_values(&self) -> [String; 2] {
        let second = match self.kind {
            RegionKind::Village => self.buffer_size.map(|b| b.to_string()),
            _ => self.code.clone(),
        };
        [self.name.clone(), second.unwrap_or_default()]
    }
}

/// Map one record and its region to a flat row.
pub fn project(stat: &YearlyRegionStat, region: &Region, epoch: Epoch) -> FlatRecord {
    let mut row = FlatRecord {
        year: epoch.to_calendar(stat.year),
        kind: region.kind,
        name: region.name.clone(),
        code: region.code.clone(),
        buffer_size: region.buffer,
        total_forest: None,
        forest_loss: None,
        forest_gain: None,
        total_forest_base: None,
        percent_forest_loss: None,
        percent_forest_gain: None,
        status: RowStatus::Ok,
    };
    match &stat.outcome {
        StatOutcome::Computed { stats, pct_loss, pct_gain } => {
            row.total_forest = Some(stats.total_forest);
            row.forest_loss = Some(stats.forest_loss);
            row.forest_gain = Some(stats.forest_gain);
            row.total_forest_base = Some(stats.total_forest_base);
            row.percent_forest_loss = pct_loss.value();
            row.percent_forest_gain = pct_gain.value();
            if stat.outcome.is_undefined() {
                row.status = RowStatus::ZeroBaseline;
            }
        }
        StatOutcome::Failed(e) => row.status = RowStatus::Failed(e.to_string()),
    }
    row
}

/// Project every record of a batch; `regions` is the batch input.
pub fn project_all(records: &[YearlyRegionStat], regions: &[Region], epoch: Epoch) -> Vec<FlatRecord> {
    records.iter().map(|r| project(r, &regions[r.region], epoch)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ZoneStats;
    use crate::batch::Percent;
    use crate::error::ReduceError;
    use crate::geometry::Polygon;

    fn village() -> Region {
        Region {
            kind: RegionKind::Village,
            name: "Ywathit".into(),
            code: None,
            buffer: Some(3000.0),
            geometry: Polygon::rect(0.0, 0.0, 1.0, 1.0).into(),
        }
    }

    fn computed(base: f64) -> StatOutcome {
        let stats = ZoneStats { total_forest: 80.0, forest_loss: 5.0, forest_gain: 1.0, total_forest_base: base };
        StatOutcome::Computed {
            stats,
            pct_loss: Percent::of(stats.forest_loss, base),
            pct_gain: Percent::of(stats.forest_gain, base),
        }
    }

    #[test]
    fn year_offset_becomes_calendar_year() {
        let stat = YearlyRegionStat { region: 0, year: 20, outcome: computed(100.0) };
        let row = project(&stat, &village(), Epoch::default());
        assert_eq!(row.year, 1990);
        assert_eq!(row.percent_forest_loss, Some(5.0));
        assert_eq!(row.status, RowStatus::Ok);
        assert_eq!(row.identity_values(), ["Ywathit".to_string(), "3000".to_string()]);
    }

    #[test]
    fn zero_baseline_leaves_percentages_empty() {
        let stat = YearlyRegionStat { region: 0, year: 20, outcome: computed(0.0) };
        let row = project(&stat, &village(), Epoch::default());
        assert_eq!(row.total_forest_base, Some(0.0));
        assert_eq!(row.percent_forest_loss, None);
        assert_eq!(row.percent_forest_gain, None);
        assert_eq!(row.status.to_string(), "zero_baseline");
    }

    #[test]
    fn failed_record_keeps_identity_and_reason() {
        let stat = YearlyRegionStat { region: 0, year: 21, outcome: StatOutcome::Failed(ReduceError::OutsideExtent) };
        let row = project(&stat, &village(), Epoch::default());
        assert_eq!(row.name, "Ywathit");
        assert_eq!(row.total_forest, None);
        assert_eq!(row.status.to_string(), "failed: geometry does not intersect the raster extent");
    }

    #[test]
    fn polygon_kinds_use_pcode_column() {
        assert_eq!(identity_columns(RegionKind::Township), ["township", "township_PCODE"]);
        let region = Region {
            kind: RegionKind::State,
            name: "Bago".into(),
            code: Some("MMR007".into()),
            buffer: None,
            geometry: Polygon::rect(0.0, 0.0, 1.0, 1.0).into(),
        };
        let stat = YearlyRegionStat { region: 0, year: 48, outcome: computed(10.0) };
        let row = project(&stat, &region, Epoch::default());
        assert_eq!(row.identity_values(), ["Bago".to_string(), "MMR007".to_string()]);
    }
}
