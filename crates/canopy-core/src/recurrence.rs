//! Forest state recurrence: event rasters → one forest mask per year.
//!
//! The baseline mask (the year before the window opens) is read straight from
//! the events. Every later mask is derived from its predecessor alone:
//!
//! ```text
//! baseline   = estab < min  |  (gain present & gain < min)  |  loss > min
//! mask[y]    = (mask[y-1] & !(loss == y))  |  estab == y  |  gain == y
//! ```
//!
//! Loss only removes forest that was already there; establishment and gain add
//! forest regardless, so a same-year gain beats a same-year loss.

#[cfg(feature = "threading")]
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::ForestError;
use crate::events::{EventStack, YearRange};
use crate::grid::GridSpec;
use crate::mask::ForestMask;

// ── Year series ───────────────────────────────────────────────────────────────

/// Contiguous, year-indexed sequence of forest masks covering
/// `[range.baseline(), range.max()]`.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSeries {
    range: YearRange,
    masks: Vec<ForestMask>,
}

impl YearSeries {
    pub fn range(&self) -> YearRange {
        self.range
    }

    /// First year held (the baseline).
    pub fn first_year(&self) -> i32 {
        self.range.baseline()
    }

    pub fn last_year(&self) -> i32 {
        self.range.max()
    }

    pub fn baseline(&self) -> &ForestMask {
        &self.masks[0]
    }

    /// Mask for `year`, or `None` outside `[baseline, max]`.
    pub fn get(&self, year: i32) -> Option<&ForestMask> {
        if year < self.first_year() || year > self.last_year() {
            return None;
        }
        self.masks.get((year - self.first_year()) as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForestMask> {
        self.masks.iter()
    }

    /// Number of masks, baseline included.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn spec(&self) -> &GridSpec {
        self.baseline().spec()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Build the full year series for `range`.
///
/// The year axis is strictly sequential; the cells within one year are
/// independent and are evaluated in parallel with the `threading` feature.
pub fn build_year_series(events: &EventStack, range: YearRange) -> Result<YearSeries, ForestError> {
    let spec = *events.spec();

    // ── 1. Baseline ─────────────────────────────────────────────────────────
    let baseline_year = range.baseline();
    let baseline = ForestMask::new(
        baseline_year,
        spec,
        cellwise(spec.len(), |i| baseline_cell(events, i, range.min())),
    );
    debug!(year = baseline_year, forest_cells = baseline.forest_cells(), "baseline mask");

    // ── 2. Forward recurrence ───────────────────────────────────────────────
    let mut masks = Vec::with_capacity(range.year_count() + 1);
    masks.push(baseline);
    for year in range.years() {
        let prev = &masks[masks.len() - 1];
        let next = ForestMask::new(
            year,
            spec,
            cellwise(spec.len(), |i| step_cell(events, i, year, prev.is_forest(i))),
        );
        debug!(year, forest_cells = next.forest_cells(), "forest mask");
        masks.push(next);
    }

    info!(
        first = baseline_year,
        last = range.max(),
        masks = masks.len(),
        cells = spec.len(),
        "year series built"
    );

    Ok(YearSeries { range, masks })
}

/// Forest state at the year before `min_year`.
#[inline]
pub fn baseline_cell(events: &EventStack, index: usize, min_year: i32) -> bool {
    events.establishment().before(index, min_year)
        || events.gain().before(index, min_year)
        || events.loss().after(index, min_year)
}

/// Forest state at `year` given the state at `year - 1`.
#[inline]
pub fn step_cell(events: &EventStack, index: usize, year: i32, was_forest: bool) -> bool {
    (was_forest && !events.loss().at(index, year))
        || events.establishment().at(index, year)
        || events.gain().at(index, year)
}

#[cfg(feature = "threading")]
fn cellwise(n: usize, f: impl Fn(usize) -> bool + Sync + Send) -> Vec<bool> {
    (0..n).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "threading"))]
fn cellwise(n: usize, f: impl Fn(usize) -> bool) -> Vec<bool> {
    (0..n).map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventRaster;
    use crate::grid::Grid;

    const MIN: i32 = 20;
    const MAX: i32 = 22;

    /// Single-cell stack; `None` means no event.
    fn one_cell(estab: Option<i32>, gain: Option<i32>, loss: Option<i32>) -> EventStack {
        let spec = GridSpec::unit(1, 1);
        let r = |v: Option<i32>| match v {
            Some(y) => EventRaster::normalized(Grid::new(spec, y), None),
            None => EventRaster::empty(spec),
        };
        EventStack::new(r(estab), r(gain), r(loss)).unwrap()
    }

    fn series(stack: &EventStack) -> YearSeries {
        build_year_series(stack, YearRange::new(MIN, MAX).unwrap()).unwrap()
    }

    #[test]
    fn baseline_established_before_window_is_forest() {
        let s = series(&one_cell(Some(MIN - 5), None, None));
        assert!(s.baseline().is_forest(0));
    }

    #[test]
    fn baseline_gain_before_window_is_forest() {
        let s = series(&one_cell(None, Some(MIN - 1), None));
        assert!(s.baseline().is_forest(0));
    }

    #[test]
    fn baseline_later_loss_implies_forest_at_start() {
        let s = series(&one_cell(None, None, Some(MIN + 1)));
        assert!(s.baseline().is_forest(0));
        // Lost in MIN + 1.
        assert!(s.get(MIN).unwrap().is_forest(0));
        assert!(!s.get(MIN + 1).unwrap().is_forest(0));
    }

    #[test]
    fn baseline_loss_in_first_year_is_not_counted() {
        // loss > min is strict: a loss in `min` itself does not imply forest.
        let s = series(&one_cell(None, None, Some(MIN)));
        assert!(!s.baseline().is_forest(0));
    }

    #[test]
    fn baseline_empty_cell_is_not_forest() {
        let s = series(&one_cell(None, None, None));
        assert!(s.iter().all(|m| !m.is_forest(0)));
    }

    #[test]
    fn loss_removes_existing_forest() {
        let s = series(&one_cell(Some(MIN - 3), None, Some(MIN + 1)));
        assert!(s.get(MIN).unwrap().is_forest(0));
        assert!(!s.get(MIN + 1).unwrap().is_forest(0));
        assert!(!s.get(MIN + 2).unwrap().is_forest(0));
    }

    #[test]
    fn gain_wins_over_same_year_loss() {
        let s = series(&one_cell(None, Some(MIN + 1), Some(MIN + 1)));
        // Forest at baseline because loss (MIN + 1) > MIN; then loss and gain
        // coincide and gain wins.
        assert!(s.get(MIN + 1).unwrap().is_forest(0));
    }

    #[test]
    fn gain_on_non_forest_adds_forest() {
        let s = series(&one_cell(None, Some(MIN + 2), None));
        assert!(!s.get(MIN + 1).unwrap().is_forest(0));
        assert!(s.get(MIN + 2).unwrap().is_forest(0));
    }

    #[test]
    fn step_rule_truth_table() {
        let stack = one_cell(None, Some(5), Some(5));
        assert!(step_cell(&stack, 0, 5, false), "gain beats loss");
        let loss_only = one_cell(None, None, Some(5));
        assert!(!step_cell(&loss_only, 0, 5, true));
        assert!(step_cell(&loss_only, 0, 6, true), "other year carries forward");
        assert!(!step_cell(&loss_only, 0, 6, false));

        let estab_only = one_cell(Some(5), None, None);
        assert!(step_cell(&estab_only, 0, 5, false), "establishment adds forest");
        assert!(!step_cell(&estab_only, 0, 6, false));
        let estab_and_loss = one_cell(Some(5), None, Some(5));
        assert!(step_cell(&estab_and_loss, 0, 5, false), "establishment beats loss");
        assert!(step_cell(&estab_and_loss, 0, 5, true));
    }

    #[test]
    fn establishment_inside_window_turns_forest_that_year() {
        let s = series(&one_cell(Some(MIN + 1), None, None));
        assert!(!s.baseline().is_forest(0));
        assert!(!s.get(MIN).unwrap().is_forest(0));
        assert!(s.get(MIN + 1).unwrap().is_forest(0));
        assert!(s.get(MIN + 2).unwrap().is_forest(0));
    }

    #[test]
    fn series_is_contiguous_one_mask_per_year() {
        let s = series(&one_cell(None, None, None));
        let years: Vec<i32> = s.iter().map(|m| m.year()).collect();
        assert_eq!(years, vec![MIN - 1, MIN, MIN + 1, MIN + 2]);
        assert_eq!(s.len(), 4);
        assert!(s.get(MIN - 2).is_none());
        assert!(s.get(MAX + 1).is_none());
    }
}
