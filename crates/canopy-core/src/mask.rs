use crate::grid::GridSpec;

/// Forest presence for one year. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestMask {
    year: i32,
    spec: GridSpec,
    cells: Vec<bool>,
}

impl ForestMask {
    pub(crate) fn new(year: i32, spec: GridSpec, cells: Vec<bool>) -> Self {
        debug_assert_eq!(cells.len(), spec.len(), "mask must cover its grid");
        Self { year, spec, cells }
    }

    /// Year offset this mask represents.
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    #[inline]
    pub fn is_forest(&self, index: usize) -> bool {
        self.cells[index]
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn forest_cells(&self) -> usize {
        self.cells.iter().filter(|&&f| f).count()
    }
}
