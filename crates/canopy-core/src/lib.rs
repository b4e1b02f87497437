//! # canopy-core
//!
//! Reconstructs annual forest masks from establishment, gain and loss event
//! rasters, then aggregates forest, loss and gain areas over point buffers
//! and administrative polygons for every year of an analysis window.
//!
//! Pipeline: [`EventStack`] → [`build_year_series`] → [`ZonalAggregator`] →
//! [`run_batch`] → [`project_all`] → [`export::write_csv`].

pub mod aggregate;
pub mod batch;
pub mod error;
pub mod events;
pub mod export;
pub mod geometry;
pub mod grid;
pub mod mask;
pub mod projection;
pub mod recurrence;
pub mod region;
pub mod shuffle;
pub mod sources;
pub mod zonal;

pub use aggregate::{ZonalAggregator, ZoneStats, ZoneStatsSource};
pub use batch::{
    percent_of, run_batch, BatchConfig, BatchReport, FailureSummary, Percent, StatOutcome,
    YearlyRegionStat,
};
pub use error::{ForestError, ReduceError, ShuffleError};
pub use events::{Epoch, EventRaster, EventStack, YearRange, NO_EVENT};
pub use geometry::{MultiPolygon, Point, Polygon};
pub use grid::{Grid, GridSpec};
pub use mask::ForestMask;
pub use projection::{project, project_all, FlatRecord, RowStatus};
pub use recurrence::{build_year_series, YearSeries};
pub use region::{AreaOfInterest, PointSite, PolygonFeature, Region, RegionKind};
pub use zonal::{CellArea, Cover, GridReducer, ZonalReducer};
