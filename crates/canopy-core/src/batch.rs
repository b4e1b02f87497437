//! Region batch processor: evaluates every (region, year) pair and collects
//! typed records.
//!
//! A failed reduction never aborts the batch. It becomes a
//! [`StatOutcome::Failed`] record and is counted in the [`FailureSummary`].

#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{ZoneStats, ZoneStatsSource};
use crate::error::{ForestError, ReduceError};
use crate::events::YearRange;
use crate::region::Region;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Batch execution knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker threads; 0 uses rayon's default. Ignored without `threading`.
    pub workers: usize,
    /// Extra attempts for transient reduction failures.
    pub retries: u32,
}

// ── Percentages ───────────────────────────────────────────────────────────────

/// `part / base * 100`, undefined on a zero base.
pub fn percent_of(part: f64, base: f64) -> Result<f64, ForestError> {
    if base == 0.0 {
        return Err(ForestError::DivisionUndefined);
    }
    Ok(part / base * 100.0)
}

/// A percentage that may be undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Percent {
    Value(f64),
    Undefined,
}

impl Percent {
    pub fn of(part: f64, base: f64) -> Self {
        percent_of(part, base).map_or(Percent::Undefined, Percent::Value)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Percent::Value(v) => Some(v),
            Percent::Undefined => None,
        }
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// Result of one (region, year) evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum StatOutcome {
    Computed { stats: ZoneStats, pct_loss: Percent, pct_gain: Percent },
    Failed(ReduceError),
}

impl StatOutcome {
    fn from_stats(stats: ZoneStats) -> Self {
        StatOutcome::Computed {
            pct_loss: Percent::of(stats.forest_loss, stats.total_forest_base),
            pct_gain: Percent::of(stats.forest_gain, stats.total_forest_base),
            stats,
        }
    }

    /// True when the reduction succeeded but the baseline was zero.
    pub fn is_undefined(&self) -> bool {
        matches!(self, StatOutcome::Computed { pct_loss: Percent::Undefined, .. })
    }
}

/// One output row before projection.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyRegionStat {
    /// Index of the region in the batch input.
    pub region: usize,
    /// Year offset from the epoch.
    pub year: i32,
    pub outcome: StatOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    /// Records whose reduction failed after all attempts.
    pub failed: usize,
    /// Records with a zero baseline.
    pub undefined: usize,
    /// Attempts beyond the first, across all records.
    pub retried: usize,
}

impl FailureSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.undefined == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Sorted by (region index, year).
    pub records: Vec<YearlyRegionStat>,
    pub summary: FailureSummary,
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Evaluate every region for every year of `range`.
///
/// Each region is reduced once for the whole window through
/// [`ZoneStatsSource::zone_series`]; only transient per-year failures are
/// retried, one year at a time.
pub fn run_batch(
    regions: &[Region],
    range: YearRange,
    source: &dyn ZoneStatsSource,
    config: &BatchConfig,
) -> BatchReport {
    let years: Vec<i32> = range.years().collect();
    let indices: Vec<usize> = (0..regions.len()).collect();
    info!(
        regions = regions.len(),
        years = years.len(),
        pairs = regions.len() * years.len(),
        "batch start"
    );

    // ── 1. Evaluate region by region ────────────────────────────────────────
    let eval = |&r: &usize| evaluate_region(source, &regions[r], r, &years, config.retries);
    let evaluated = evaluate_all(&indices, eval, config.workers);

    // ── 2. Order and summarize ──────────────────────────────────────────────
    let mut summary = FailureSummary::default();
    let mut records = Vec::with_capacity(regions.len() * years.len());
    for (rec, attempts) in evaluated.into_iter().flatten() {
        summary.retried += attempts - 1;
        match &rec.outcome {
            StatOutcome::Failed(e) => {
                summary.failed += 1;
                let region = &regions[rec.region];
                warn!(region = %region.name, kind = %region.kind, year = rec.year, error = %e, "zonal reduction failed");
            }
            o if o.is_undefined() => summary.undefined += 1,
            _ => {}
        }
        records.push(rec);
    }
    records.sort_by_key(|r| (r.region, r.year));

    if summary.is_clean() {
        info!(records = records.len(), "batch complete");
    } else {
        warn!(
            records = records.len(),
            failed = summary.failed,
            zero_baseline = summary.undefined,
            retried = summary.retried,
            "batch complete with gaps"
        );
    }
    BatchReport { records, summary }
}

/// Every year of one region, each with its attempt count.
fn evaluate_region(
    source: &dyn ZoneStatsSource,
    region: &Region,
    index: usize,
    years: &[i32],
    retries: u32,
) -> Vec<(YearlyRegionStat, usize)> {
    let mut first = source.zone_series(years, &region.geometry).into_iter();
    years
        .iter()
        .map(|&year| {
            let result = first
                .next()
                .unwrap_or_else(|| source.zone_stats(year, &region.geometry));
            let (outcome, attempts) = settle(source, region, year, result, retries);
            (YearlyRegionStat { region: index, year, outcome }, attempts)
        })
        .collect()
}

/// Bounded retry on transient errors, starting from a first result.
/// Returns the attempt count.
fn settle(
    source: &dyn ZoneStatsSource,
    region: &Region,
    year: i32,
    first: Result<ZoneStats, ReduceError>,
    retries: u32,
) -> (StatOutcome, usize) {
    let mut attempts = 1;
    let mut result = first;
    loop {
        match result {
            Ok(stats) => return (StatOutcome::from_stats(stats), attempts),
            Err(e) if e.is_transient() && attempts <= retries as usize => {
                debug!(region = %region.name, year, attempt = attempts, error = %e, "retrying");
                attempts += 1;
                result = source.zone_stats(year, &region.geometry);
            }
            Err(e) => return (StatOutcome::Failed(e), attempts),
        }
    }
}

#[cfg(feature = "threading")]
fn evaluate_all<I, T, F>(items: &[I], f: F, workers: usize) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync + Send,
{
    let run = || items.par_iter().map(&f).collect::<Vec<T>>();
    if workers == 0 {
        return run();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(run),
        Err(e) => {
            warn!(workers, error = %e, "could not build worker pool, using the global one");
            run()
        }
    }
}

#[cfg(not(feature = "threading"))]
fn evaluate_all<I, T, F>(items: &[I], f: F, _workers: usize) -> Vec<T>
where
    F: Fn(&I) -> T,
{
    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{MultiPolygon, Polygon};
    use crate::region::RegionKind;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn region(name: &str, x: f64) -> Region {
        Region {
            kind: RegionKind::Township,
            name: name.into(),
            code: Some(format!("P-{name}")),
            buffer: None,
            geometry: Polygon::rect(x, 0.0, x + 1.0, 1.0).into(),
        }
    }

    /// Deterministic stats from the zone position and year.
    struct Fixed;

    impl ZoneStatsSource for Fixed {
        fn zone_stats(&self, year: i32, zone: &MultiPolygon) -> Result<ZoneStats, ReduceError> {
            let x = zone.bbox().min_x;
            Ok(ZoneStats {
                total_forest: 100.0 - year as f64,
                forest_loss: 5.0 + x,
                forest_gain: 0.0,
                total_forest_base: 100.0,
            })
        }
    }

    /// Fails every zone whose bbox starts beyond x = 5.
    struct FailsFarZones;

    impl ZoneStatsSource for FailsFarZones {
        fn zone_stats(&self, year: i32, zone: &MultiPolygon) -> Result<ZoneStats, ReduceError> {
            if zone.bbox().min_x > 5.0 {
                return Err(ReduceError::OutsideExtent);
            }
            Fixed.zone_stats(year, zone)
        }
    }

    /// Times out the first `fail` calls.
    struct Flaky {
        fail: usize,
        calls: AtomicUsize,
    }

    impl ZoneStatsSource for Flaky {
        fn zone_stats(&self, year: i32, zone: &MultiPolygon) -> Result<ZoneStats, ReduceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail {
                return Err(ReduceError::TimedOut { elapsed: std::time::Duration::from_millis(1) });
            }
            Fixed.zone_stats(year, zone)
        }
    }

    fn range() -> YearRange {
        YearRange::new(19, 22).unwrap()
    }

    #[test]
    fn percent_of_computes_and_rejects_zero_base() {
        assert_relative_eq!(percent_of(5.0, 100.0).unwrap(), 5.0);
        assert_eq!(percent_of(1.0, 0.0), Err(ForestError::DivisionUndefined));
        assert_eq!(Percent::of(0.0, 0.0), Percent::Undefined);
    }

    #[test]
    fn records_cover_the_cross_product_in_order() {
        let regions = vec![region("a", 0.0), region("b", 2.0)];
        let report = run_batch(&regions, range(), &Fixed, &BatchConfig::default());
        let keys: Vec<(usize, i32)> = report.records.iter().map(|r| (r.region, r.year)).collect();
        assert_eq!(
            keys,
            vec![(0, 19), (0, 20), (0, 21), (0, 22), (1, 19), (1, 20), (1, 21), (1, 22)]
        );
        assert!(report.summary.is_clean());
    }

    #[test]
    fn loss_percent_is_against_baseline() {
        let regions = vec![region("a", 0.0)];
        let report = run_batch(&regions, range(), &Fixed, &BatchConfig::default());
        match &report.records[0].outcome {
            StatOutcome::Computed { pct_loss, pct_gain, .. } => {
                assert_eq!(*pct_loss, Percent::Value(5.0));
                assert_eq!(*pct_gain, Percent::Value(0.0));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn failing_region_does_not_affect_others() {
        let regions = vec![region("near", 0.0), region("far", 10.0), region("near2", 3.0)];
        let report = run_batch(&regions, range(), &FailsFarZones, &BatchConfig::default());
        assert_eq!(report.records.len(), 12);
        assert_eq!(report.summary.failed, 4);
        for rec in &report.records {
            let failed = matches!(rec.outcome, StatOutcome::Failed(_));
            assert_eq!(failed, rec.region == 1, "record {rec:?}");
        }
    }

    #[test]
    fn worker_count_does_not_change_results() {
        let regions: Vec<Region> = (0..8).map(|i| region(&format!("r{i}"), i as f64)).collect();
        let one = run_batch(&regions, range(), &FailsFarZones, &BatchConfig { workers: 1, retries: 0 });
        let four = run_batch(&regions, range(), &FailsFarZones, &BatchConfig { workers: 4, retries: 0 });
        assert_eq!(one, four);
    }

    #[test]
    fn transient_failures_are_retried() {
        let regions = vec![region("a", 0.0)];
        let flaky = Flaky { fail: 2, calls: AtomicUsize::new(0) };
        let cfg = BatchConfig { workers: 1, retries: 2 };
        let report = run_batch(&regions, YearRange::new(19, 19).unwrap(), &flaky, &cfg);
        assert!(matches!(report.records[0].outcome, StatOutcome::Computed { .. }));
        assert_eq!(report.summary.retried, 2);
    }

    #[test]
    fn retries_are_bounded() {
        let regions = vec![region("a", 0.0)];
        let flaky = Flaky { fail: usize::MAX, calls: AtomicUsize::new(0) };
        let cfg = BatchConfig { workers: 1, retries: 1 };
        let report = run_batch(&regions, YearRange::new(19, 19).unwrap(), &flaky, &cfg);
        assert!(matches!(report.records[0].outcome, StatOutcome::Failed(ReduceError::TimedOut { .. })));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    /// Serves whole windows and times out the first year of each window.
    struct Windowed {
        series_calls: AtomicUsize,
        single_calls: AtomicUsize,
    }

    impl ZoneStatsSource for Windowed {
        fn zone_stats(&self, year: i32, zone: &MultiPolygon) -> Result<ZoneStats, ReduceError> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            Fixed.zone_stats(year, zone)
        }

        fn zone_series(&self, years: &[i32], zone: &MultiPolygon) -> Vec<Result<ZoneStats, ReduceError>> {
            self.series_calls.fetch_add(1, Ordering::SeqCst);
            years
                .iter()
                .enumerate()
                .map(|(i, &year)| {
                    if i == 0 {
                        Err(ReduceError::TimedOut { elapsed: std::time::Duration::from_millis(1) })
                    } else {
                        Fixed.zone_stats(year, zone)
                    }
                })
                .collect()
        }
    }

    #[test]
    fn each_region_is_reduced_once_for_the_window() {
        let regions = vec![region("a", 0.0), region("b", 2.0), region("c", 4.0)];
        let source = Windowed { series_calls: AtomicUsize::new(0), single_calls: AtomicUsize::new(0) };
        let cfg = BatchConfig { workers: 2, retries: 1 };
        let report = run_batch(&regions, range(), &source, &cfg);

        assert_eq!(source.series_calls.load(Ordering::SeqCst), 3);
        // Only the timed-out first year of each region is retried.
        assert_eq!(source.single_calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.summary.retried, 3);
        assert!(report.summary.is_clean());
        let plain = run_batch(&regions, range(), &Fixed, &BatchConfig::default());
        assert_eq!(report.records, plain.records);
    }

    #[test]
    fn zero_baseline_is_counted_as_undefined() {
        struct Bare;
        impl ZoneStatsSource for Bare {
            fn zone_stats(&self, _: i32, _: &MultiPolygon) -> Result<ZoneStats, ReduceError> {
                Ok(ZoneStats { total_forest: 0.0, forest_loss: 0.0, forest_gain: 0.0, total_forest_base: 0.0 })
            }
        }
        let report = run_batch(&[region("a", 0.0)], range(), &Bare, &BatchConfig::default());
        assert_eq!(report.summary.undefined, 4);
        assert!(report.records.iter().all(|r| r.outcome.is_undefined()));
    }
}
