use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use canopy_core::region::DEFAULT_BUFFER_RADII;
use canopy_core::zonal::DEFAULT_MAX_CELLS;
use canopy_core::{BatchConfig, Epoch, GridReducer, RegionKind, YearRange};

/// Top-level canopy configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanopyConfig {
    /// First calendar year of the analysis window.
    pub min_year: i32,
    /// Last calendar year of the analysis window.
    pub max_year: i32,
    /// Calendar year that event offsets count from.
    #[serde(default = "default_epoch")]
    pub epoch: i32,
    /// Directory CSV files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    pub rasters: RasterToml,

    #[serde(default)]
    pub cell_area: CellAreaToml,

    #[serde(default)]
    pub buffers: BufferToml,

    #[serde(default)]
    pub batch: BatchToml,

    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryToml>,

    /// Directory of the config file; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_epoch() -> i32 {
    1970
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RasterToml {
    pub establishment: PathBuf,
    pub gain: PathBuf,
    pub loss: PathBuf,
    #[serde(default)]
    pub establishment_nodata: Option<i32>,
    #[serde(default = "default_event_nodata")]
    pub gain_nodata: Option<i32>,
    #[serde(default = "default_event_nodata")]
    pub loss_nodata: Option<i32>,
}

fn default_event_nodata() -> Option<i32> {
    Some(0)
}

/// How cell areas are obtained.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CellAreaToml {
    /// Cell width × height of a projected grid.
    #[default]
    Planar,
    /// Latitude-corrected m² for a lon/lat grid.
    Geographic,
    Uniform { value: f64 },
    Raster { path: PathBuf },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferToml {
    #[serde(default = "default_radii")]
    pub radii: Vec<f64>,
    #[serde(default = "default_segments")]
    pub segments: usize,
}

impl Default for BufferToml {
    fn default() -> Self {
        Self { radii: default_radii(), segments: default_segments() }
    }
}

fn default_radii() -> Vec<f64> {
    DEFAULT_BUFFER_RADII.to_vec()
}
fn default_segments() -> usize {
    canopy_core::geometry::DEFAULT_CIRCLE_SEGMENTS
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchToml {
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_max_cells")]
    pub max_cells: u64,
    /// Per-reduction deadline in seconds.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

impl Default for BatchToml {
    fn default() -> Self {
        Self { workers: 0, retries: 0, max_cells: default_max_cells(), timeout_secs: None }
    }
}

fn default_max_cells() -> u64 {
    DEFAULT_MAX_CELLS
}

/// One exported region category.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryToml {
    /// Used in the output file name.
    pub name: String,
    pub kind: RegionKind,
    /// Point sites for villages, polygon features otherwise.
    pub source: PathBuf,
    #[serde(default)]
    pub filter: Option<FilterToml>,
}

/// Area-of-interest filter for polygon categories.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterToml {
    pub kind: FilterKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Points,
    Polygons,
}

impl CanopyConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let mut cfg: CanopyConfig = toml::from_str(&text)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        cfg.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(cfg)
    }

    /// Resolve a config-relative path.
    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.epoch)
    }

    pub fn year_range(&self) -> Result<YearRange> {
        YearRange::from_calendar(self.epoch(), self.min_year, self.max_year)
            .context("invalid analysis window")
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig { workers: self.batch.workers, retries: self.batch.retries }
    }

    pub fn reducer(&self) -> Result<GridReducer> {
        let timeout = match self.batch.timeout_secs {
            Some(s) => Some(
                Duration::try_from_secs_f64(s)
                    .with_context(|| format!("invalid timeout_secs: {s}"))?,
            ),
            None => None,
        };
        Ok(GridReducer { max_cells: self.batch.max_cells, timeout })
    }
}
